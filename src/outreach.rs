use anyhow::{anyhow, Result};

use crate::models::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RequestKind {
    /// Ask the expert to answer screening questions
    Screening,
    /// Ask the expert for consultation availability
    Availability,
}

impl RequestKind {
    fn subject(&self, name: &str) -> String {
        match self {
            Self::Screening => format!("Screening Questions - {}", name),
            Self::Availability => format!("Availability Request - {}", name),
        }
    }

    fn body(&self, name: &str, sender: Option<&str>) -> String {
        let ask = match self {
            Self::Screening => "We would like to request your responses to our screening questions.",
            Self::Availability => "We would like to request your availability for a potential consultation.",
        };
        let mut body = format!("Hi {},\n\n{}", name, ask);
        if let Some(sender) = sender {
            body.push_str(&format!("\n\nBest regards,\n{}", sender));
        }
        body
    }
}

/// Build a `mailto:` link asking the candidate for screening answers or
/// availability.
pub fn mailto_link(candidate: &Candidate, kind: RequestKind, sender: Option<&str>) -> Result<String> {
    let email = candidate
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| anyhow!("{} has no email address on file", candidate.name))?;

    Ok(format!(
        "mailto:{}?subject={}&body={}",
        email,
        urlencoding::encode(&kind.subject(&candidate.name)),
        urlencoding::encode(&kind.body(&candidate.name, sender)),
    ))
}
