//! Image identification and registry lookup.
//!
//! A computation image is registered on the ledger under an address derived
//! from its content hash and the request program's identity. [`locate`] is
//! the pure derivation; [`locate_verified`] additionally checks that the
//! image is actually registered before a request references it.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::ledger::{derive_address, Address, Ledger, LedgerError};

/// Width of an image content hash in bytes.
pub const IMAGE_ID_LEN: usize = 32;

/// The derived address of a registered image's registry account.
pub type ImageAddress = Address;

/// Content hash identifying a registered computation image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId([u8; IMAGE_ID_LEN]);

impl ImageId {
    pub fn new(bytes: [u8; IMAGE_ID_LEN]) -> Self {
        ImageId(bytes)
    }

    /// Parse an image id from its 64-character hex form.
    pub fn from_hex(s: &str) -> Result<Self, LocateError> {
        let bytes = hex::decode(s).map_err(|_| LocateError::InvalidImageId(s.to_string()))?;
        let bytes: [u8; IMAGE_ID_LEN] = bytes
            .try_into()
            .map_err(|_| LocateError::InvalidImageId(s.to_string()))?;
        Ok(ImageId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; IMAGE_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", hex::encode(self.0))
    }
}

/// Errors from image-id parsing and registry lookup.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("invalid image id {0:?}: expected a 32-byte hex hash")]
    InvalidImageId(String),

    #[error("image {image} is not registered (no account at {address})")]
    ImageNotRegistered { image: ImageId, address: ImageAddress },

    #[error("image account {address} is owned by {actual}, expected {expected}")]
    ImageOwnerMismatch {
        address: ImageAddress,
        expected: Address,
        actual: Address,
    },

    #[error("registry lookup failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Derive the registry address for `image_id` under `program`.
///
/// Pure and deterministic: identical inputs always yield the same address.
pub fn locate(image_id: &ImageId, program: &Address) -> ImageAddress {
    derive_address(&[image_id.as_bytes()], program)
}

/// [`locate`], plus a read-only check that the image is registered and its
/// registry account is owned by the expected program.
pub async fn locate_verified(
    ledger: &dyn Ledger,
    image_id: &ImageId,
    program: &Address,
) -> Result<ImageAddress, LocateError> {
    let address = locate(image_id, program);
    debug!("verifying image {} at {}", image_id, address);

    match ledger.get_account(&address).await? {
        None => Err(LocateError::ImageNotRegistered { image: *image_id, address }),
        Some(info) if info.owner != *program => Err(LocateError::ImageOwnerMismatch {
            address,
            expected: *program,
            actual: info.owner,
        }),
        Some(_) => Ok(address),
    }
}
