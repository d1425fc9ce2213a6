//! spotme library
//!
//! Authorizes against the Spotify accounts service with the OAuth 2.0
//! authorization code flow with PKCE, then fetches and renders the user's
//! profile, top artists and top tracks.
//!
//! # Modules
//!
//! - `api` - HTTP handlers of the local callback listener
//! - `cli` - Command implementations and terminal rendering
//! - `config` - Explicit runtime configuration loaded from the environment
//! - `error` - Typed errors for every fallible operation
//! - `management` - Durable store, session cache and the dashboard loader
//! - `server` - Local HTTP listener for the OAuth redirect
//! - `spotify` - Accounts service and Web API client
//! - `types` - Data structures shared across modules
//! - `utils` - PKCE helpers and small terminal utilities

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Opening the authorization page...");
/// info!("Found {} top tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the command layer uses this. Library functions return errors.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a dimmed diagnostic line when `SPOTME_DEBUG` is set.
#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => ({
    if $crate::config::debug_enabled() {
      use colored::Colorize;
      eprintln!("[{}] {}", "~".dimmed(), std::format_args!($($arg)*));
    }
  })
}
