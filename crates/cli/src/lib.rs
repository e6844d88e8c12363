pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "adesao",
    about = "Adesao operator CLI",
    long_about = "Inspect configuration, check upstream readiness and drive the registration form flow from the terminal.",
    after_help = "Examples:\n  adesao doctor --json\n  adesao lookup-cep 01310-100\n  adesao check-cpf 529.982.247-25 1990-05-17\n  adesao register applicant.toml"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config and upstream reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Resolve an address from a CEP")]
    LookupCep { cep: String },
    #[command(about = "Ask whether a CPF is already registered")]
    CheckCpf {
        cpf: String,
        #[arg(help = "Birth date as YYYY-MM-DD or DD/MM/YYYY")]
        birth_date: String,
    },
    #[command(about = "Submit a registration described by a TOML form file")]
    Register { file: PathBuf },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::LookupCep { cep } => commands::lookup::lookup_cep(&cep),
        Command::CheckCpf { cpf, birth_date } => commands::lookup::check_cpf(&cpf, &birth_date),
        Command::Register { file } => commands::register::run(&file),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
