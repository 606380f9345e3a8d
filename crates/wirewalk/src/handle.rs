// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capability handles carried alongside message bytes.

use crate::config::HANDLE_ABSENT;
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Owned capability handle. Moving it out of a slot leaves an invalid handle behind.
#[derive(PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    pub const fn invalid() -> Self {
        Self(HANDLE_ABSENT)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != HANDLE_ABSENT
    }

    /// Move the handle out, invalidating `self`.
    pub fn take(&mut self) -> Handle {
        std::mem::replace(self, Handle::invalid())
    }

    pub fn into_raw(self) -> u32 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Handle({:#x})", self.0)
        } else {
            write!(f, "Handle(INVALID)")
        }
    }
}

/// Kind of kernel object a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectType(pub u32);

impl ObjectType {
    /// No type requirement.
    pub const NONE: Self = Self(0);
    pub const PROCESS: Self = Self(1);
    pub const THREAD: Self = Self(2);
    pub const VMO: Self = Self(3);
    pub const CHANNEL: Self = Self(4);
    pub const EVENT: Self = Self(5);
    pub const PORT: Self = Self(6);
    pub const SOCKET: Self = Self(14);
    pub const EVENTPAIR: Self = Self(16);
    pub const JOB: Self = Self(17);
}

/// Rights mask attached to a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rights(pub u32);

impl Rights {
    pub const NONE: Self = Self(0);
    pub const DUPLICATE: Self = Self(1 << 0);
    pub const TRANSFER: Self = Self(1 << 1);
    pub const READ: Self = Self(1 << 2);
    pub const WRITE: Self = Self(1 << 3);
    pub const EXECUTE: Self = Self(1 << 4);
    pub const MAP: Self = Self(1 << 5);
    pub const GET_PROPERTY: Self = Self(1 << 6);
    pub const SET_PROPERTY: Self = Self(1 << 7);
    pub const SIGNAL: Self = Self(1 << 12);
    pub const WAIT: Self = Self(1 << 14);
    /// Keep whatever rights the handle already has.
    pub const SAME_RIGHTS: Self = Self(1 << 31);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: Rights) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Rights {
    type Output = Rights;

    fn bitor(self, rhs: Rights) -> Rights {
        Rights(self.0 | rhs.0)
    }
}

impl BitAnd for Rights {
    type Output = Rights;

    fn bitand(self, rhs: Rights) -> Rights {
        Rights(self.0 & rhs.0)
    }
}

/// A handle as received with an incoming message.
#[derive(Debug, PartialEq, Eq)]
pub struct HandleInfo {
    pub handle: Handle,
    pub object_type: ObjectType,
    pub rights: Rights,
}

impl HandleInfo {
    pub fn new(handle: Handle, object_type: ObjectType, rights: Rights) -> Self {
        Self {
            handle,
            object_type,
            rights,
        }
    }
}

/// A handle queued for an outgoing message, tagged with the type and rights
/// the schema declares for its slot.
#[derive(Debug, PartialEq, Eq)]
pub struct HandleDisposition {
    pub handle: Handle,
    pub object_type: ObjectType,
    pub rights: Rights,
}

impl HandleDisposition {
    /// What the receiving end observes for this handle.
    pub fn into_info(self) -> HandleInfo {
        HandleInfo::new(self.handle, self.object_type, self.rights)
    }
}
