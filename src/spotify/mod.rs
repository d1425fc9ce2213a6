//! # Spotify Integration Module
//!
//! Talks to the two Spotify services the application needs:
//!
//! - [`auth`] - the accounts service: PKCE redirect, authorization-code
//!   exchange and refresh-token grant
//! - [`me`] - the Web API resources of the current user: profile, top
//!   artists and top tracks
//!
//! Every function takes the [`Config`](crate::config::Config) explicitly and
//! returns a typed error; none of them terminates the process.

pub mod auth;
pub mod me;
