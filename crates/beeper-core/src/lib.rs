#![cfg_attr(not(test), no_std)]

pub mod buzzer;
pub mod capability;
pub mod consts;
pub mod event;
pub mod indicator;
pub mod log_buffer;
pub mod service;
pub mod trigger;
pub mod wake;

#[cfg(test)]
mod fakes;
