use crate::config::{Platform, load_config};
use crate::font::FontRegistry;
use crate::service::{Query, Reply, Service};
use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "giftboard", version, about = "Live-stream gift statistics rendered as PNG tables")]
pub struct Args {
    /// TOML config file; built-in defaults when omitted
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for rendered PNG files
    #[arg(short = 'o', long = "out-dir", global = true, default_value = ".")]
    pub out_dir: PathBuf,

    /// Requesting user id, used for logging only
    #[arg(short = 'u', long = "user", global = true, default_value_t = 0)]
    pub user: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformArg {
    Vr,
    Psp,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Vr => Platform::Vr,
            PlatformArg::Psp => Platform::Psp,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Monthly revenue ranking of one platform
    Ranking {
        #[arg(short, long, value_enum)]
        platform: PlatformArg,
        /// YYYYMM or YYYY-MM; current month when omitted
        month: Option<String>,
    },
    /// Ranking over both platforms merged
    Brawl { month: Option<String> },
    /// Rooms live right now
    Live {
        #[arg(short, long, value_enum)]
        platform: PlatformArg,
    },
    /// Session history of one anchor
    Sessions {
        #[arg(required = true, num_args = 1..)]
        args: Vec<String>,
    },
    /// Super chats of one anchor, paginated
    SuperChat {
        #[arg(required = true, num_args = 1..)]
        args: Vec<String>,
    },
    /// Monthly revenue card of one anchor
    Revenue {
        #[arg(required = true, num_args = 1..)]
        args: Vec<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ranking { .. } => "ranking",
            Command::Brawl { .. } => "brawl",
            Command::Live { .. } => "live",
            Command::Sessions { .. } => "sessions",
            Command::SuperChat { .. } => "super-chat",
            Command::Revenue { .. } => "revenue",
        }
    }

    pub fn to_query(&self) -> Query {
        match self {
            Command::Ranking { platform, month } => Query::Ranking {
                platform: (*platform).into(),
                args: month.clone().unwrap_or_default(),
            },
            Command::Brawl { month } => Query::Brawl {
                args: month.clone().unwrap_or_default(),
            },
            Command::Live { platform } => Query::Live {
                platform: (*platform).into(),
            },
            Command::Sessions { args } => Query::Sessions { args: args.join(" ") },
            Command::SuperChat { args } => Query::SuperChat { args: args.join(" ") },
            Command::Revenue { args } => Query::Revenue { args: args.join(" ") },
        }
    }
}

fn write_png(out_dir: &Path, name: &str, index: usize, b64: &str) -> Result<PathBuf> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .context("reply image is not valid base64")?;
    let path = out_dir.join(format!("{name}-{index}.png"));
    std::fs::write(&path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

/// Writes reply images as `<out_dir>/<name>-<n>.png` (n from 1) and returns
/// the lines to print: text replies verbatim, otherwise the written paths.
pub fn write_reply(reply: Reply, out_dir: &Path, name: &str) -> Result<Vec<String>> {
    match reply {
        Reply::Text(text) => Ok(vec![text]),
        Reply::Image(b64) => {
            std::fs::create_dir_all(out_dir)?;
            let path = write_png(out_dir, name, 1, &b64)?;
            Ok(vec![path.display().to_string()])
        }
        Reply::Forward(bundle) => {
            std::fs::create_dir_all(out_dir)?;
            let mut lines = vec![bundle.intro];
            for (idx, node) in bundle.nodes.iter().enumerate() {
                let path = write_png(out_dir, name, idx + 1, &node.image)?;
                lines.push(format!("{} {}", node.label, path.display()));
            }
            Ok(lines)
        }
    }
}

pub async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let fonts = FontRegistry::load(&config.render).context("cannot load fonts")?;
    let service = Service::new(config, Arc::new(fonts))?;

    let reply = service.handle(args.command.to_query(), args.user).await;
    for line in write_reply(reply, &args.out_dir, args.command.name())? {
        println!("{line}");
    }
    Ok(())
}
