use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan a kitchen's prep production schedule", long_about = None)]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Owner whose schedule is being planned
    #[arg(short, long, global = true, default_value = "default")]
    pub owner: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a schedule for the given menu items and save it
    Generate {
        /// Menu catalog (CSV or JSON)
        #[arg(long)]
        catalog: PathBuf,
        /// Menu item ids to put on the prep list
        #[arg(long, value_delimiter = ',', required = true)]
        items: Vec<String>,
    },
    /// Print the saved schedule
    Show {
        /// Menu catalog (CSV or JSON)
        #[arg(long)]
        catalog: PathBuf,
        /// Timeline width in characters
        #[arg(long, default_value_t = 66)]
        width: usize,
        /// Show ingredients and procedure for this prep-list item
        #[arg(long)]
        item: Option<String>,
    },
    /// Move one task to a new start time (snapped and clamped to the window)
    Move {
        /// Menu catalog (CSV or JSON)
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        task: String,
        /// New start time, HH:MM
        #[arg(long)]
        to: String,
    },
    /// Forget the saved schedule
    Clear,
    /// Search the catalog by name or cuisine
    Search {
        #[arg(long)]
        catalog: PathBuf,
        term: String,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "prep_schedule",
            "--owner",
            "chef-1",
            "generate",
            "--catalog",
            "menu.csv",
            "--items",
            "a,b",
        ])
        .unwrap();
        assert_eq!(cli.owner, "chef-1");
        match cli.command {
            Command::Generate { items, .. } => assert_eq!(items, vec!["a", "b"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_show_with_item() {
        let cli = Cli::try_parse_from(["prep_schedule", "show", "--catalog", "menu.csv", "--item", "a"]).unwrap();
        match cli.command {
            Command::Show { item, width, .. } => {
                assert_eq!(item.as_deref(), Some("a"));
                assert_eq!(width, 66);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_generate_requires_items() {
        assert!(Cli::try_parse_from(["prep_schedule", "generate", "--catalog", "menu.csv"]).is_err());
    }
}
