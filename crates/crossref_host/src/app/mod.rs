mod atomic_io;
mod bootstrap;
mod components;
mod runner;
mod scenario;

pub(crate) use bootstrap::{init_tracing, run, HostConfig};
