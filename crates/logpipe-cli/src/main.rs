// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::io::{stdin, stdout, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use logpipe::{
    config::Config,
    constants::{CREDENTIAL_ENV, LOG_LEVEL_ENV},
    http::get_client,
    ingest::run_pipeline,
    sender::HttpSender,
};

const ABOUT: &str = "Pipe logs to newrelic";

const LONG_ABOUT: &str = "\
NAME
	logpipe - pipe logs to newrelic

SYNOPSIS
	export NR_KEY=\"\"
	export NR_URL=\"\" # optional
	echo hi newrelic | logpipe
	app 2>&1 | logpipe [-f flushdur] [-t httptimeout] [--debug] [--echo]

DESCRIPTION
	Logpipe sends every line read from its standard input to
	newrelic as a log line. If the log line is valid json, and contains
	an integer \"ts\" field at its top level, that value is used as the
	newrelic timestamp.

	Logpipe will automatically batch log lines. See OPTIONS.

	Durations take a unit suffix and whole numbers, such as 500ms,
	5s or 1m30s. Fractional values such as 1.5s are not accepted.

	Fatal errors are always printed to stderr, whatever the log
	level. NR_LOG_LEVEL only controls the diagnostic log.

	Set at least NR_KEY to your newrelic license key and run
	the examples as above. If you are in a different region, set
	$NR_URL too. HTTPS_PROXY is honored for the intake connection.

	Termination signals are not intercepted: killing logpipe loses
	lines that were read but not yet sent.";

#[derive(Parser, Debug)]
#[command(name = "logpipe", version, about = ABOUT, long_about = LONG_ABOUT)]
struct Args {
    /// Flush logs after this duration
    #[arg(short = 'f', long = "flush", default_value = "5s", value_parser = humantime::parse_duration)]
    flush_interval: Duration,

    /// HTTP timeout for each request
    #[arg(short = 't', long = "timeout", default_value = "5s", value_parser = humantime::parse_duration)]
    http_timeout: Duration,

    /// Debug output to stderr
    #[arg(long)]
    debug: bool,

    /// Copy every input line to stdout
    #[arg(long)]
    echo: bool,
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug".to_string()
    } else {
        env::var(LOG_LEVEL_ENV)
            .map(|val| val.to_lowercase())
            .unwrap_or("error".to_string())
    };
    init_logging(&log_level);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("logpipe: {e}");
            if matches!(e, logpipe::errors::ConfigError::MissingCredential) {
                eprintln!("logpipe: export {CREDENTIAL_ENV}=");
            }
            return ExitCode::FAILURE;
        }
    };

    let sender = match HttpSender::new(&config, get_client(&config)) {
        Ok(sender) => sender,
        Err(e) => {
            eprintln!("logpipe: {e}");
            return ExitCode::FAILURE;
        }
    };

    let echo = config.echo.then(stdout);
    match run_pipeline(BufReader::new(stdin()), echo, sender, &config).await {
        Ok(summary) => {
            debug!("shipped {summary:?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("logpipe: {e}");
            // Returning would wait on the blocking stdin read, which may never complete
            std::process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> Result<Config, logpipe::errors::ConfigError> {
    let mut config = Config::from_env()?;
    config.flush_interval = args.flush_interval;
    config.http_timeout = args.http_timeout;
    config.echo = args.echo;
    config.validate()?;
    Ok(config)
}

fn init_logging(log_level: &str) {
    let env_filter = format!("h2=off,hyper=off,hyper_util=off,rustls=off,reqwest=off,{log_level}");
    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("error"));

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("logpipe: failed to install logger: {e}");
    }
}
