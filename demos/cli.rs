use std::error;
use std::fs;

use clap;
use clap::Parser as CLIParser;

#[cfg(not(feature = "serde_json"))]
#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Settings {
    /// Filepath to file to parse
    #[clap(short, long)]
    input: String,

    /// Return only the entry with this citation key
    #[clap(short, long)]
    query_id: Option<String>,
}

#[cfg(feature = "serde_json")]
#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Settings {
    /// Filepath to file to parse
    #[clap(short, long)]
    input: String,

    /// Return only the entry with this citation key
    #[clap(short, long)]
    query_id: Option<String>,

    #[clap(long)]
    json: bool,
}

fn print_human_readable(s: &Settings) -> Result<(), Box<dyn error::Error>> {
    let src = fs::read_to_string(&s.input)?;
    let (bibliography, diagnostics) = bibliograph::parse(&src)?;

    for diagnostic in &diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    for entry in bibliography.iter() {
        if let Some(query) = &s.query_id {
            if query != &entry.id {
                continue;
            }
        }
        println!("type = {}", entry.kind);
        println!("id = {}", entry.id);
        for (name, value) in entry.fields.iter() {
            println!("\t{}\t= {}", name, value.flattened());
        }
    }

    Ok(())
}

#[cfg(feature = "serde_json")]
fn print_json(s: &Settings) -> Result<(), Box<dyn error::Error>> {
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        kind: String,
        id: String,
        fields: HashMap<String, String>,
    }

    #[derive(Serialize, Deserialize)]
    struct Output {
        data: Vec<Entry>,
        warnings: Vec<String>,
    }

    let src = fs::read_to_string(&s.input)?;
    let (bibliography, diagnostics) = bibliograph::parse(&src)?;

    let mut output = Output {
        data: Vec::new(),
        warnings: diagnostics.iter().map(|d| d.to_string()).collect(),
    };
    for entry in bibliography.iter() {
        if let Some(query) = &s.query_id {
            if query != &entry.id {
                continue;
            }
        }

        output.data.push(Entry {
            kind: entry.kind.clone(),
            id: entry.id.clone(),
            fields: entry
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), value.flattened()))
                .collect(),
        });
    }

    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let settings = Settings::parse();

    #[cfg(feature = "serde_json")]
    {
        if settings.json {
            print_json(&settings)?;
        } else {
            print_human_readable(&settings)?;
        }
    }
    #[cfg(not(feature = "serde_json"))]
    {
        print_human_readable(&settings)?;
    }

    Ok(())
}
