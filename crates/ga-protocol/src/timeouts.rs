//! Timing constants for the coordinator/helper/client protocol (§5),
//! confirmed against the original implementation's `GASERVER_READTIMEOUT`,
//! `GASERVER_FEEDBACKTIMEOUT`, and `GASERVER_MAXCLOSETIME` constants.

use std::time::Duration;

/// How long a connection may go without a readable message before the
/// reader treats it as dead.
pub const READ_TIMEOUT: Duration = Duration::from_secs(600);

/// How often the coordinator owes the client a CURRENT_BEST or KEEPALIVE.
pub const CLIENT_FEEDBACK_INTERVAL: Duration = Duration::from_secs(20);

/// How long the coordinator waits for a client's connection to close
/// cleanly after a run concludes before forcing it shut.
pub const CLIENT_CLOSE_TIMEOUT: Duration = Duration::from_secs(60);

/// How often an idle endpoint (no other outgoing traffic) emits KEEPALIVE.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
