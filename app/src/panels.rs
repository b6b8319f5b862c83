//! Panel registration and domain availability.

use panelpay_core::environment::Clock;
use panelpay_core::model::{NewPanel, Panel, PaymentRecord};
use panelpay_core::store::{PaymentStore, StoreError};
use panelpay_core::validation::{
    is_valid_domain, is_valid_email, normalize_nigerian_phone, required, subdomain_format_error,
};
use panelpay_core::{BoxFuture, PanelId, PaymentError, PaymentStatus};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;

/// Panel registration input.
#[derive(Debug, Clone, Default)]
pub struct RegisterPanel {
    /// Display name
    pub name: Option<String>,
    /// Requested subdomain
    pub subdomain: Option<String>,
    /// Optional custom domain
    pub custom_domain: Option<String>,
    /// Owner name
    pub owner_name: Option<String>,
    /// Owner email
    pub owner_email: Option<String>,
    /// Owner phone (Nigerian mobile)
    pub owner_phone: Option<String>,
}

/// Answer to a subdomain or domain availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Whether the name can be used
    pub valid: bool,
    /// Human-readable reason
    pub message: String,
    /// DNS record family found, for custom domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<&'static str>,
}

impl Availability {
    fn available(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
            record_type: None,
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            record_type: None,
        }
    }
}

/// Host name resolution used by the custom-domain check.
pub trait DomainResolver: Send + Sync {
    /// Addresses `domain` resolves to.
    ///
    /// # Errors
    ///
    /// Returns the resolver's message when the lookup fails.
    fn resolve<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, String>>;
}

/// Resolver backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl DomainResolver for SystemResolver {
    fn resolve<'a>(&'a self, domain: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, String>> {
        Box::pin(async move {
            tokio::net::lookup_host((domain, 80))
                .await
                .map(|addrs| addrs.map(|a| a.ip()).collect())
                .map_err(|e| e.to_string())
        })
    }
}

/// Panel registration, lookup and availability checks.
#[derive(Clone)]
pub struct PanelService {
    store: Arc<dyn PaymentStore>,
    clock: Arc<dyn Clock>,
    resolver: Arc<dyn DomainResolver>,
}

impl PanelService {
    /// Create a panel service.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        clock: Arc<dyn Clock>,
        resolver: Arc<dyn DomainResolver>,
    ) -> Self {
        Self {
            store,
            clock,
            resolver,
        }
    }

    /// Validate and store a new, unpaid panel.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::Validation`] for missing or malformed fields
    /// - [`PaymentError::DuplicateSubdomain`] when the subdomain exists
    pub async fn register(&self, request: RegisterPanel) -> Result<Panel, PaymentError> {
        let name = required("name", request.name.as_deref())?;
        let subdomain = required("subdomain", request.subdomain.as_deref())?.to_lowercase();
        if let Some(reason) = subdomain_format_error(&subdomain) {
            return Err(PaymentError::validation(reason));
        }

        let custom_domain = match request.custom_domain.as_deref().map(str::trim) {
            Some(domain) if !domain.is_empty() => {
                let domain = domain.to_lowercase();
                if !is_valid_domain(&domain) {
                    return Err(PaymentError::validation("Invalid domain format"));
                }
                Some(domain)
            }
            _ => None,
        };

        let owner_email = required("ownerEmail", request.owner_email.as_deref())?;
        if !is_valid_email(&owner_email) {
            return Err(PaymentError::validation("ownerEmail is not a valid email"));
        }
        let owner_phone =
            normalize_nigerian_phone(&required("ownerPhone", request.owner_phone.as_deref())?)?;
        let owner_name = request
            .owner_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let panel = self
            .store
            .create_panel(
                NewPanel {
                    name,
                    subdomain,
                    custom_domain,
                    owner_name,
                    owner_email,
                    owner_phone,
                },
                self.clock.now(),
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict {
                    field: "subdomain",
                    value,
                } => PaymentError::DuplicateSubdomain(value),
                StoreError::Conflict { field, value } => {
                    PaymentError::validation(format!("{field} {value} is already in use"))
                }
                other => PaymentError::Storage(other),
            })?;

        tracing::info!(panel_id = %panel.id, subdomain = %panel.subdomain, "Panel registered");
        Ok(panel)
    }

    /// A panel and its setup payments, newest first.
    ///
    /// # Errors
    ///
    /// [`PaymentError::NotFound`] for an unknown panel.
    pub async fn get(&self, id: PanelId) -> Result<(Panel, Vec<PaymentRecord>), PaymentError> {
        let panel = self
            .store
            .get_panel(id)
            .await?
            .ok_or_else(|| PaymentError::not_found("Panel", id))?;
        let payments = self.store.payments_for_panel(id).await?;
        Ok((panel, payments))
    }

    /// Whether `subdomain` is well formed and not held by a paid panel.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the lookup fails.
    pub async fn check_subdomain(&self, subdomain: &str) -> Result<Availability, PaymentError> {
        let subdomain = subdomain.trim().to_lowercase();
        if subdomain.is_empty() {
            return Ok(Availability::unavailable("Subdomain is required"));
        }
        if let Some(reason) = subdomain_format_error(&subdomain) {
            return Ok(Availability::unavailable(reason));
        }

        let taken = self
            .store
            .find_panel_by_subdomain(&subdomain)
            .await?
            .is_some_and(|p| p.payment_status == PaymentStatus::Completed);

        Ok(if taken {
            Availability::unavailable("Subdomain is already taken")
        } else {
            Availability::available("Subdomain is available")
        })
    }

    /// Whether `domain` is well formed, unclaimed and resolves in DNS.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the lookup fails.
    pub async fn verify_domain(&self, domain: &str) -> Result<Availability, PaymentError> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Ok(Availability::unavailable("Domain is required"));
        }
        if !is_valid_domain(&domain) {
            return Ok(Availability::unavailable("Invalid domain format"));
        }

        let claimed = self
            .store
            .find_panel_by_custom_domain(&domain)
            .await?
            .is_some_and(|p| p.payment_status == PaymentStatus::Completed);
        if claimed {
            return Ok(Availability::unavailable(
                "Domain is already in use by another panel",
            ));
        }

        match self.resolver.resolve(&domain).await {
            Ok(addrs) if !addrs.is_empty() => {
                let record_type = if addrs.iter().any(IpAddr::is_ipv4) {
                    "A"
                } else {
                    "AAAA"
                };
                Ok(Availability {
                    valid: true,
                    message: "Domain resolves and is available".to_string(),
                    record_type: Some(record_type),
                })
            }
            Ok(_) => Ok(Availability::unavailable(
                "Domain has no A or AAAA records; point it at the panel host first",
            )),
            Err(e) => {
                tracing::debug!(%domain, error = %e, "Domain lookup failed");
                Ok(Availability::unavailable(
                    "Domain does not resolve; check your DNS settings",
                ))
            }
        }
    }
}

impl std::fmt::Debug for PanelService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelService").finish_non_exhaustive()
    }
}
