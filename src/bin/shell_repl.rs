//! A minimal developer REPL over the shell core, for exercising the
//! executor outside a browser host.

use std::io::{self, Write};

use clap::Parser;
use samwise_shell::executor::{self, ExecutionContext};
use samwise_shell::SystemContext;

#[derive(Parser, Debug)]
#[command(name = "shell-repl", about = "Interactive SamwiseOS shell core REPL")]
struct Cli {
    /// User to start the session as.
    #[arg(long, default_value = "root")]
    user: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let system = SystemContext::new();
    let mut session = system.new_session(&cli.user);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{}@samwise:{}$ ", session.current_user(), session.cwd());
        io::stdout().flush().ok();
        line.clear();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let trimmed = line.trim_end_matches('\n');
        if trimmed.is_empty() {
            continue;
        }
        let mut vfs = system.vfs.lock().unwrap();
        let mut users = system.users.lock().unwrap();
        let mut groups = system.groups.lock().unwrap();
        let mut ctx = ExecutionContext {
            vfs: &mut vfs,
            users: &mut users,
            groups: &mut groups,
            sudo: &system.sudo,
            config: &system.config,
            session: &mut session,
            story: &system.story,
        };
        match executor::execute(trimmed, &mut ctx, "").await {
            Ok(outcome) => {
                if !outcome.stdout.is_empty() {
                    println!("{}", outcome.stdout);
                }
            }
            Err(err) => {
                eprintln!("{}", err.message);
                if let Some(suggestion) = &err.suggestion {
                    eprintln!("  hint: {}", suggestion);
                }
            }
        }
    }
}
