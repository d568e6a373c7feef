//! # leadgate-channels
//!
//! Transport adapters: webhook wire types and normalization into
//! `InboundMessage`, plus the outbound reply clients.

pub mod telegram;
pub mod whatsapp;
