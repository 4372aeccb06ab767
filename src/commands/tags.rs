//! `pagewiki tag` subcommands

use serde_json::json;

use crate::cli::{Cli, TagCommands};
use crate::commands::format::{output_by_format_result, print_json, print_json_status, say};
use crate::commands::pages::require_page;
use pagewiki_core::cache::WindowSession;
use pagewiki_core::error::Result;

pub fn execute(cli: &Cli, session: &WindowSession, command: &TagCommands) -> Result<()> {
    let store = session.store();
    match command {
        TagCommands::Set { id, tags } => {
            require_page(store, *id)?;
            let applied = session.set_tags(*id, tags)?;
            print_tags(cli, &applied)
        }
        TagCommands::Show { id } => {
            require_page(store, *id)?;
            print_tags(cli, &store.tags_for_page(*id)?)
        }
        TagCommands::Find { query } => {
            let found = store.fuzzy_find_tags(query)?;
            output_by_format_result!(cli.format,
                json => print_json(&found),
                human => {
                    for entry in &found {
                        println!("{}\t{}", entry.tag, entry.count);
                    }
                }
            )
        }
        TagCommands::List { popular: true } => {
            let popular = store.popular_tags()?;
            output_by_format_result!(cli.format,
                json => print_json(&popular),
                human => {
                    for entry in &popular {
                        println!("{}\t{}", entry.tag, entry.count);
                    }
                }
            )
        }
        TagCommands::List { popular: false } => print_tags(cli, &store.all_tags()?),
        TagCommands::Cleanup => {
            let removed = store.cleanup_orphaned_tags()?;
            output_by_format_result!(cli.format,
                json => print_json_status("ok", None, &[("removed", json!(removed))]),
                human => {
                    say(cli, format!("Removed {} unused tag(s)", removed));
                }
            )
        }
    }
}

fn print_tags(cli: &Cli, tags: &[String]) -> Result<()> {
    output_by_format_result!(cli.format,
        json => print_json(tags),
        human => {
            for tag in tags {
                println!("{}", tag);
            }
        }
    )
}
