// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pending interrupt requests, one slot per priority level.

use crate::exception::AUTOVECTOR_BASE;
use crate::Error;

#[derive(Clone, Copy, Debug)]
struct InterruptRequest {
    /// Explicit vector number, or `None` for autovectored delivery.
    vector: Option<u8>,
}

/// Records at most one outstanding request per level 1..7 and hands the
/// highest unmasked one to the core between instructions.
#[derive(Debug, Default)]
pub(crate) struct InterruptController {
    requests: [Option<InterruptRequest>; 8],
}

impl InterruptController {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn request(&mut self, level: u8, vector: Option<u8>) -> Result<(), Error> {
        if level > 7 {
            return Err(Error::InvalidInterruptLevel(level));
        }
        if level == 0 {
            return Ok(());
        }

        self.requests[level as usize] = Some(InterruptRequest { vector });
        Ok(())
    }

    /// Consumes and returns the highest pending `(level, vector)` strictly
    /// above `mask`, if any.
    pub(crate) fn pending(&mut self, mask: u8) -> Option<(u8, u8)> {
        for level in (1..=7u8).rev() {
            if level <= mask {
                break;
            }

            if let Some(request) = self.requests[level as usize].take() {
                let vector = request.vector.unwrap_or(AUTOVECTOR_BASE + level);
                return Some((level, vector));
            }
        }

        None
    }
}
