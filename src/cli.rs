//! Command-line adapter over the command handlers.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::commands::{self, AppState, FileNames};
use crate::config;
use crate::controller::{ErrorSink, LifecycleController, TracingErrorSink};
use crate::core::PathResolver;
use crate::engine::ExternalEngineFactory;
use crate::error::AppError;

#[derive(Debug, Parser)]
#[command(name = "shadow-monitor")]
#[command(about = "Generate transparent-proxy configs from rule files and supervise the engine")]
pub struct Cli {
    /// Directory holding config.json, servers.json and rules/
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Engine executable, launched as `<engine> -c <config>`
    #[arg(short, long, default_value = "shadow")]
    pub engine: PathBuf,

    /// Engine config file name
    #[arg(long, default_value = config::CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the selectable rule modes
    Rules,
    /// List the configured servers
    Servers,
    /// Write a server and rule mode into the engine config
    Generate {
        #[arg(short, long, default_value = "")]
        server: String,
        #[arg(short, long, default_value = "")]
        mode: String,
    },
    /// Run the engine until stdin closes or a line reading `stop` is entered
    Run,
}

impl Cli {
    fn build_state(&self) -> Result<AppState, AppError> {
        let paths = match &self.workdir {
            Some(dir) => PathResolver::with_base(dir),
            None => PathResolver::from_current_dir()?,
        };
        let files = FileNames {
            config: self.config.clone(),
            ..FileNames::default()
        };
        let errors: Arc<dyn ErrorSink> = Arc::new(TracingErrorSink);
        let controller = LifecycleController::new(
            paths.clone(),
            ExternalEngineFactory::new(&self.engine),
            Arc::clone(&errors),
        )
        .with_options(crate::controller::ControllerOptions {
            config_file: files.config.clone(),
            ..Default::default()
        });
        Ok(AppState::new(paths, files, controller, errors))
    }

    /// Execute the selected command.
    pub fn execute(&self) -> Result<(), AppError> {
        let state = self.build_state()?;
        match &self.command {
            Command::Rules => {
                for id in commands::report(&state, commands::rules::load_rules(&state))? {
                    println!("{id}");
                }
            }
            Command::Servers => {
                for name in commands::report(&state, commands::rules::load_servers(&state))? {
                    println!("{name}");
                }
            }
            Command::Generate { server, mode } => {
                commands::report(&state, commands::rules::load_rules(&state))?;
                commands::report(&state, commands::rules::load_servers(&state))?;
                commands::report(&state, commands::rules::generate(&state, server, mode))?;
                println!("Config is Generated...");
            }
            Command::Run => {
                commands::report(&state, commands::system::start(&state))?;
                println!("{}", commands::status_label(commands::system::status(&state)));
                wait_for_stop_request();
                commands::system::exit(&state);
                println!("{}", commands::status_label(commands::system::status(&state)));
            }
        }
        Ok(())
    }
}

fn wait_for_stop_request() {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("stop") => return,
            Ok(_) => {}
            Err(_) => return,
        }
    }
}
