//! Address Resolver, postal lookup and customer session behavior.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::atomic::{AtomicUsize, Ordering};

use deskly_client::{CustomerSession, PostalLookup, SessionError};
use deskly_core::{
    AddressDraft, AddressKind, ApiError, CartError, ErrorClass, PostalAddress, default_of,
};
use deskly_integration_tests::{FakeStorefront, Op, draft, http_error, password};
use secrecy::SecretString;

async fn logged_in(api: &FakeStorefront, email: &str) -> CustomerSession<FakeStorefront> {
    let mut session = CustomerSession::new(api.clone());
    session.login(email, &password()).await.unwrap();
    session
}

/// Knows one CEP and counts lookups.
#[derive(Default)]
struct FakePostal {
    calls: AtomicUsize,
}

impl PostalLookup for FakePostal {
    async fn lookup(&self, zip_code: &str) -> Result<Option<PostalAddress>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((zip_code == "50050000").then(|| PostalAddress {
            zip_code: zip_code.to_owned(),
            street: "Rua da Aurora".to_owned(),
            district: "Boa Vista".to_owned(),
            city: "Recife".to_owned(),
            state: "PE".to_owned(),
        }))
    }
}

// =============================================================================
// Address Resolver
// =============================================================================

#[tokio::test]
async fn test_create_validates_before_request() {
    let api = FakeStorefront::new();
    let _ = api.add_customer("ana@example.com", "Ana");
    let session = logged_in(&api, "ana@example.com").await;
    let mut resolver = session.addresses();

    let err = resolver
        .create(AddressDraft {
            street: "  ".to_owned(),
            ..draft("Casa")
        })
        .await
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Validation);
    assert!(err.field_errors.contains_key("street"));
    assert_eq!(api.calls(Op::CreateAddress), 0);
    assert!(resolver.addresses().is_empty());
}

#[tokio::test]
async fn test_create_normalizes_zip() {
    let api = FakeStorefront::new();
    let _ = api.add_customer("ana@example.com", "Ana");
    let session = logged_in(&api, "ana@example.com").await;
    let mut resolver = session.addresses();

    let created = resolver.create(draft("Casa")).await.unwrap();

    assert_eq!(created.zip_code, "50050000");
    assert_eq!(resolver.addresses(), &[created]);
}

#[tokio::test]
async fn test_new_default_replaces_previous_default() {
    let api = FakeStorefront::new();
    let customer = api.add_customer("ana@example.com", "Ana");
    let session = logged_in(&api, "ana@example.com").await;
    let mut resolver = session.addresses();

    let first = resolver
        .create(AddressDraft {
            is_delivery_default: true,
            ..draft("Casa")
        })
        .await
        .unwrap();
    let second = resolver
        .create(AddressDraft {
            is_delivery_default: true,
            ..draft("Trabalho")
        })
        .await
        .unwrap();

    let local = default_of(resolver.addresses(), AddressKind::Delivery).unwrap();
    assert_eq!(local.id, second.id);
    let stored = api.addresses_of(customer);
    assert_eq!(
        stored.iter().filter(|a| a.is_delivery_default).count(),
        1
    );
    assert!(!stored.iter().any(|a| a.id == first.id && a.is_delivery_default));
}

#[tokio::test]
async fn test_set_default_uses_server_list() {
    let api = FakeStorefront::new();
    let customer = api.add_customer("ana@example.com", "Ana");
    let home = api.add_address(
        customer,
        AddressDraft {
            is_delivery_default: true,
            is_billing_default: true,
            ..draft("Casa")
        },
    );
    let work = api.add_address(customer, draft("Trabalho"));
    let session = logged_in(&api, "ana@example.com").await;
    let mut resolver = session.addresses();
    resolver.list().await.unwrap();

    let addresses = resolver
        .set_default(work.id, AddressKind::Billing)
        .await
        .unwrap()
        .to_vec();

    assert_eq!(
        default_of(&addresses, AddressKind::Billing).map(|a| a.id),
        Some(work.id)
    );
    // The delivery default is untouched
    assert_eq!(
        default_of(&addresses, AddressKind::Delivery).map(|a| a.id),
        Some(home.id)
    );
    assert_eq!(addresses, api.addresses_of(customer));
}

#[tokio::test]
async fn test_set_default_failures_leave_list_unchanged() {
    let api = FakeStorefront::new();
    let ana = api.add_customer("ana@example.com", "Ana");
    let bruno = api.add_customer("bruno@example.com", "Bruno");
    let _ = api.add_address(ana, draft("Casa"));
    let foreign = api.add_address(bruno, draft("Casa do Bruno"));
    let session = logged_in(&api, "ana@example.com").await;
    let mut resolver = session.addresses();
    let before = resolver.list().await.unwrap().to_vec();

    let err = resolver
        .set_default(foreign.id, AddressKind::Delivery)
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Forbidden);
    assert_eq!(resolver.addresses(), before.as_slice());

    api.fail_next(Op::SetDefaultAddress, http_error(409, "concurrent change"));
    let err = resolver
        .set_default(before[0].id, AddressKind::Delivery)
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Conflict);
    assert_eq!(resolver.addresses(), before.as_slice());
    assert!(!api.addresses_of(bruno)[0].is_delivery_default);
}

// =============================================================================
// Postal Lookup
// =============================================================================

#[tokio::test]
async fn test_lookup_requires_eight_digits() {
    let api = FakeStorefront::new();
    let session = CustomerSession::new(api);
    let postal = FakePostal::default();

    let err = session
        .addresses()
        .lookup_postal_code(&postal, "5005-000")
        .await
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Validation);
    assert_eq!(postal.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_prefill_fills_only_blank_fields() {
    let api = FakeStorefront::new();
    let session = CustomerSession::new(api);
    let postal = FakePostal::default();
    let mut form = AddressDraft {
        label: "Casa".to_owned(),
        number: "12".to_owned(),
        city: "Olinda".to_owned(),
        zip_code: "50050-000".to_owned(),
        ..AddressDraft::default()
    };

    let found = session.addresses().prefill(&postal, &mut form).await.unwrap();

    assert!(found);
    assert_eq!(form.street, "Rua da Aurora");
    assert_eq!(form.district, "Boa Vista");
    assert_eq!(form.city, "Olinda");
    assert_eq!(form.state, "PE");
}

#[tokio::test]
async fn test_unknown_cep_changes_nothing() {
    let api = FakeStorefront::new();
    let session = CustomerSession::new(api);
    let postal = FakePostal::default();
    let mut form = AddressDraft {
        zip_code: "01001000".to_owned(),
        ..AddressDraft::default()
    };

    let found = session.addresses().prefill(&postal, &mut form).await.unwrap();

    assert!(!found);
    assert!(form.street.is_empty());
    assert_eq!(postal.calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Session and Cart Store
// =============================================================================

#[tokio::test]
async fn test_add_to_cart_merges_lines() {
    let api = FakeStorefront::new();
    let desk = api.add_product("Mesa", 89_990);
    let mut session = CustomerSession::new(api);

    assert_eq!(session.add_to_cart(desk, 1).await.unwrap(), 1);
    assert_eq!(session.add_to_cart(desk, 2).await.unwrap(), 3);
    assert_eq!(session.cart().len(), 1);
    assert_eq!(session.cart().item_count(), 3);
}

#[tokio::test]
async fn test_add_to_cart_rejects_zero_and_inactive() {
    let api = FakeStorefront::new();
    let desk = api.add_product("Mesa", 89_990);
    api.deactivate(desk);
    let mut session = CustomerSession::new(api.clone());

    let err = session.add_to_cart(desk, 0).await.unwrap_err();
    assert!(matches!(err, SessionError::Cart(CartError::ZeroQuantity)));
    assert_eq!(api.calls(Op::GetProduct), 0);

    let err = session.add_to_cart(desk, 1).await.unwrap_err();
    assert!(matches!(err, SessionError::ProductUnavailable(id) if id == desk));
    assert!(session.cart().is_empty());
}

#[tokio::test]
async fn test_logout_clears_cart() {
    let api = FakeStorefront::new();
    let _ = api.add_customer("ana@example.com", "Ana");
    let desk = api.add_product("Mesa", 89_990);
    let mut session = logged_in(&api, "ana@example.com").await;
    session.add_to_cart(desk, 1).await.unwrap();

    session.logout().await.unwrap();

    assert!(!session.is_logged_in());
    assert!(session.cart().is_empty());
}

#[tokio::test]
async fn test_expired_session_keeps_cart() {
    let api = FakeStorefront::new();
    let _ = api.add_customer("ana@example.com", "Ana");
    let desk = api.add_product("Mesa", 89_990);
    let mut session = logged_in(&api, "ana@example.com").await;
    session.add_to_cart(desk, 2).await.unwrap();
    api.expire_session();

    let err = session.my_orders().await.unwrap_err();

    assert_eq!(err.class, ErrorClass::Auth);
    assert!(!session.is_logged_in());
    assert_eq!(session.cart().item_count(), 2);

    session.login("ana@example.com", &password()).await.unwrap();
    assert_eq!(session.cart().item_count(), 2);
}

#[tokio::test]
async fn test_wrong_password_is_auth_error() {
    let api = FakeStorefront::new();
    let _ = api.add_customer("ana@example.com", "Ana");
    let mut session = CustomerSession::new(api);

    let err = session
        .login("ana@example.com", &SecretString::from("wrong password"))
        .await
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Auth);
    assert!(session.customer().is_none());
}
