//! Vein mining on top of `veinmine-engine`: the block catalog, rewards, tool
//! wear, configuration, statistics and commands, plus an in-process sandbox
//! host used by the `veinmine` binary and the tests.

pub mod block;
pub mod command;
pub mod config;
pub mod durability;
pub mod effects;
pub mod host;
pub mod item;
pub mod messages;
pub mod miner;
pub mod processor;
pub mod rewards;
pub mod sandbox;
pub mod stats;
