//! Error types for calendar group operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::calendar::CalendarError;

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Invalid group data: {0}")]
    Validation(String),

    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Calendar '{0}' not found")]
    CalendarNotFound(String),

    #[error("Group '{0}' already exists")]
    AlreadyExists(String),

    #[error("No groups file to back up at {}", .0.display())]
    NoBackupSource(PathBuf),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calendar backend error: {0}")]
    Calendar(#[from] CalendarError),
}

impl GroupError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Group, calendar, or backup source missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GroupNotFound(_) | Self::CalendarNotFound(_) | Self::NoBackupSource(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Durable-write failures. Collaborator failures are not storage errors.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }
}

pub type GroupResult<T> = Result<T, GroupError>;
