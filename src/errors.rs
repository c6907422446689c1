// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Mass Assignment Radar Error Types
 * Contractual error taxonomy with thiserror
 *
 * Every message string here is observable through the host envelope and
 * must not be reworded.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadarError {
    // Validation
    #[error("requestId is required")]
    RequestIdRequired,

    #[error("maxMutations must be >= 1")]
    MaxMutationsTooSmall,

    #[error("maxMutations must be <= 256")]
    MaxMutationsTooLarge,

    #[error("persistenceDelayMs must be >= 0")]
    PersistenceDelayNegative,

    #[error("persistenceDelayMs must be <= 10000")]
    PersistenceDelayTooLarge,

    #[error("candidateFields is too large")]
    CandidateFieldsTooLarge,

    #[error("verification.delayMs must be >= 0")]
    VerificationDelayNegative,

    #[error("verification.delayMs must be <= 10000")]
    VerificationDelayTooLarge,

    #[error("verification url is required")]
    VerificationUrlRequired,

    #[error("limit must be >= 1")]
    LimitTooSmall,

    #[error("limit must be <= 5000")]
    LimitTooLarge,

    #[error("findings is empty")]
    FindingsEmpty,

    #[error("too many findings")]
    TooManyFindings,

    #[error("host is required")]
    HostRequired,

    #[error("port is invalid")]
    PortInvalid,

    #[error("request is empty")]
    RequestEmpty,

    #[error("raw request is empty")]
    RawRequestEmpty,

    #[error("invalid request line")]
    InvalidRequestLine,

    #[error("baseline url is invalid")]
    BaselineUrlInvalid,

    // Preconditions
    #[error("request {0} not found")]
    RequestNotFound(String),

    #[error("request Content-Type is not application/json")]
    NotJsonContentType,

    #[error("request body is empty")]
    EmptyBody,

    #[error("body is not valid JSON")]
    InvalidJsonBody,

    #[error("request JSON body must be an object")]
    BodyNotObject,

    #[error("no mutations generated (all candidate fields already exist in request body)")]
    NoMutations,

    // Transport
    #[error("failed to send baseline request")]
    BaselineSendFailed,

    #[error("failed to send verification request")]
    VerificationSendFailed,

    #[error("verification request has no response")]
    VerificationNoResponse,

    // Sink
    #[error("failed to create findings: {0}")]
    SinkFailed(String),

    /// Request store internals (I/O, lock poisoning). Not part of the
    /// contractual taxonomy; surfaced verbatim.
    #[error("{0}")]
    Store(String),
}

/// Result type for scanner operations.
pub type RadarResult<T> = Result<T, RadarError>;
