//! Address Resolver: the customer's address book.
//!
//! The local list only ever changes to reflect a server response. Failed
//! requests leave it as it was.

use deskly_core::{
    Address, AddressDraft, AddressId, AddressKind, ApiError, PostalAddress, apply_default,
};
use tracing::instrument;

use crate::api::StorefrontApi;
use crate::postal::{PostalLookup, validate_cep};

pub struct AddressResolver<'a, A> {
    api: &'a A,
    addresses: Vec<Address>,
}

impl<'a, A: StorefrontApi> AddressResolver<'a, A> {
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self {
            api,
            addresses: Vec::new(),
        }
    }

    /// Addresses as of the last successful request.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Fetch the customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns the classified request failure.
    pub async fn list(&mut self) -> Result<&[Address], ApiError> {
        self.addresses = self.api.list_addresses().await?;
        Ok(&self.addresses)
    }

    /// Validate and create an address.
    ///
    /// Required fields are checked and the zip code is reduced to digits
    /// before any request is made.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for a bad draft, or the request failure.
    #[instrument(skip(self, draft))]
    pub async fn create(&mut self, draft: AddressDraft) -> Result<Address, ApiError> {
        let draft = draft.validate()?;
        let created = self.api.create_address(&draft).await?;

        self.addresses.retain(|a| a.id != created.id);
        self.addresses.push(created.clone());
        for kind in [AddressKind::Delivery, AddressKind::Billing] {
            if created.is_default(kind) {
                apply_default(&mut self.addresses, created.id, kind)?;
            }
        }
        Ok(created)
    }

    /// Make `id` the default of `kind`.
    ///
    /// The server clears the previous default atomically; the local list is
    /// replaced with the list it returns.
    ///
    /// # Errors
    ///
    /// Returns the request failure (`NotFound`, `Forbidden`, `Conflict`, ...).
    #[instrument(skip(self), fields(address_id = %id, kind = %kind))]
    pub async fn set_default(
        &mut self,
        id: AddressId,
        kind: AddressKind,
    ) -> Result<&[Address], ApiError> {
        self.addresses = self.api.set_default_address(id, kind).await?;
        Ok(&self.addresses)
    }

    /// Look up a zip code.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error unless the code has 8 digits, or the
    /// lookup failure.
    pub async fn lookup_postal_code<P: PostalLookup>(
        &self,
        postal: &P,
        zip_code: &str,
    ) -> Result<Option<PostalAddress>, ApiError> {
        let cep = validate_cep(zip_code)?;
        postal.lookup(&cep).await
    }

    /// Look up the draft's zip code and fill its blank fields.
    ///
    /// Returns whether the code was found. Fields already typed are kept.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lookup_postal_code`].
    pub async fn prefill<P: PostalLookup>(
        &self,
        postal: &P,
        draft: &mut AddressDraft,
    ) -> Result<bool, ApiError> {
        match self.lookup_postal_code(postal, &draft.zip_code).await? {
            Some(found) => {
                draft.prefill(&found);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
