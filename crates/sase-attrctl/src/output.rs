//! Output formatting

use clap::ValueEnum;
use sase_attributes::{AttributeMap, SourceDescriptor};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Resolution result for one principal
#[derive(Debug, Serialize)]
pub struct ResolvedPrincipal {
    pub principal: String,
    pub attributes: Option<AttributeMap>,
}

/// Registered source as shown to operators
#[derive(Debug, Serialize)]
pub struct SourceRow {
    pub name: String,
    pub priority: i32,
}

impl From<&SourceDescriptor> for SourceRow {
    fn from(d: &SourceDescriptor) -> Self {
        Self {
            name: d.name().to_string(),
            priority: d.priority,
        }
    }
}

impl OutputFormat {
    pub fn print_resolved(&self, resolved: &[ResolvedPrincipal]) {
        match self {
            OutputFormat::Json => print_json(&resolved),
            OutputFormat::Text => print!("{}", render_resolved(resolved)),
        }
    }

    pub fn print_sources(&self, sources: &[SourceRow]) {
        match self {
            OutputFormat::Json => print_json(&sources),
            OutputFormat::Text => {
                for row in sources {
                    println!("{:>11}  {}", row.priority, row.name);
                }
            }
        }
    }

    pub fn print<T: Serialize + std::fmt::Debug>(&self, data: &T) {
        match self {
            OutputFormat::Json => print_json(data),
            OutputFormat::Text => println!("{:#?}", data),
        }
    }
}

fn print_json<T: Serialize>(data: &T) {
    println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
}

/// Plain text listing, one block per principal
pub fn render_resolved(resolved: &[ResolvedPrincipal]) -> String {
    let mut out = String::new();
    for entry in resolved {
        let _ = writeln!(out, "{}", entry.principal);
        match &entry.attributes {
            None => {
                let _ = writeln!(out, "  (no attributes)");
            }
            Some(attributes) => {
                for (name, values) in attributes {
                    let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
                    let _ = writeln!(out, "  {}: {}", name, joined.join(", "));
                }
            }
        }
    }
    out
}
