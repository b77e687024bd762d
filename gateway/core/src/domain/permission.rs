// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! POSIX Permission Bits
//!
//! Parses the owner/group/other permission string reported by the remote
//! store and evaluates read/write access for an identity. The evaluation is
//! done locally; the remote store's own access checks are never consulted.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Permission triple parsing and access evaluation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::identity::Identity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionParseError {
    #[error("Invalid permission string: {0:?}")]
    Invalid(String),
}

/// Read/write/execute bits of one permission class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessBits {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl AccessBits {
    fn from_octal_digit(digit: u32) -> Self {
        Self {
            read: digit & 0o4 != 0,
            write: digit & 0o2 != 0,
            execute: digit & 0o1 != 0,
        }
    }

    fn from_symbolic(chunk: &[char]) -> Option<Self> {
        let read = match chunk[0] {
            'r' => true,
            '-' => false,
            _ => return None,
        };
        let write = match chunk[1] {
            'w' => true,
            '-' => false,
            _ => return None,
        };
        // s/S and t/T carry setuid/sticky information in the execute slot
        let execute = match chunk[2] {
            'x' | 's' | 't' => true,
            '-' | 'S' | 'T' => false,
            _ => return None,
        };
        Some(Self { read, write, execute })
    }

    fn octal(&self) -> u32 {
        (self.read as u32) << 2 | (self.write as u32) << 1 | self.execute as u32
    }
}

/// The class of an identity relative to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionClass {
    Owner,
    Group,
    Other,
}

impl PermissionClass {
    /// Owner match wins over group membership, which wins over "other".
    pub fn of(identity: &Identity, owner: &str, group: &str) -> Self {
        if identity.name() == owner {
            PermissionClass::Owner
        } else if identity.is_group_member(group) {
            PermissionClass::Group
        } else {
            PermissionClass::Other
        }
    }
}

impl fmt::Display for PermissionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionClass::Owner => f.write_str("user"),
            PermissionClass::Group => f.write_str("group"),
            PermissionClass::Other => f.write_str("others"),
        }
    }
}

/// Owner/group/other permission triple (`rwxrwxrwx`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionBits {
    pub owner: AccessBits,
    pub group: AccessBits,
    pub other: AccessBits,
}

impl PermissionBits {
    /// Build from a numeric mode; only the low nine bits are used.
    pub fn from_mode(mode: u32) -> Self {
        Self {
            owner: AccessBits::from_octal_digit((mode >> 6) & 0o7),
            group: AccessBits::from_octal_digit((mode >> 3) & 0o7),
            other: AccessBits::from_octal_digit(mode & 0o7),
        }
    }

    pub fn mode(&self) -> u32 {
        self.owner.octal() << 6 | self.group.octal() << 3 | self.other.octal()
    }

    pub fn class(&self, class: PermissionClass) -> AccessBits {
        match class {
            PermissionClass::Owner => self.owner,
            PermissionClass::Group => self.group,
            PermissionClass::Other => self.other,
        }
    }

    pub fn can_read(&self, class: PermissionClass) -> bool {
        self.class(class).read
    }

    pub fn can_write(&self, class: PermissionClass) -> bool {
        self.class(class).write
    }
}

impl FromStr for PermissionBits {
    type Err = PermissionParseError;

    /// Accepts the symbolic form (`rwxr-x---`, optionally prefixed with a
    /// type character such as `d`) or an octal mode (`755`, `1777`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PermissionParseError::Invalid(s.to_string());

        if !s.is_empty() && s.len() <= 4 && s.chars().all(|c| ('0'..='7').contains(&c)) {
            let mode = u32::from_str_radix(s, 8).map_err(|_| invalid())?;
            return Ok(Self::from_mode(mode));
        }

        let chars: Vec<char> = s.chars().collect();
        let bits = match chars.len() {
            9 => &chars[..],
            10 => &chars[1..],
            _ => return Err(invalid()),
        };

        Ok(Self {
            owner: AccessBits::from_symbolic(&bits[0..3]).ok_or_else(invalid)?,
            group: AccessBits::from_symbolic(&bits[3..6]).ok_or_else(invalid)?,
            other: AccessBits::from_symbolic(&bits[6..9]).ok_or_else(invalid)?,
        })
    }
}

impl fmt::Display for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bits in [self.owner, self.group, self.other] {
            write!(
                f,
                "{}{}{}",
                if bits.read { 'r' } else { '-' },
                if bits.write { 'w' } else { '-' },
                if bits.execute { 'x' } else { '-' },
            )?;
        }
        Ok(())
    }
}
