// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Mass Assignment Radar
 * Mutation-based scanner for mass-assignment defects in JSON APIs
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod cancel;
pub mod errors;
pub mod types;

// JSON body model and mutation generation
pub mod json_model;
pub mod mutator;

// Request store adapter and the live reqwest-backed store
pub mod http_client;
pub mod store;

// Scan engine
pub mod classifier;
pub mod scanner;

// Host integration: findings delivery and the RPC surface
pub mod rpc;
pub mod sink;
