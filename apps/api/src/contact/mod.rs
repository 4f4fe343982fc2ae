//! Contact form relayed to the team's Slack channel.

pub mod handlers;
