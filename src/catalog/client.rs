//! HTTP client for the e.Leclerc flyer API and its Woosmap store locator.
//!
//! The flyer side needs three calls: list current operations, list the
//! stores an operation runs in, and list the page images of one operation
//! for one store (which itself takes two requests: store → document UID,
//! then document UID → pages). Both APIs check the `Referer` header, so
//! every request carries the one the public web front-end sends.

use super::types::{GeoPosition, Locality, PageDescriptor, Prospectus, Store};
use super::CatalogSource;
use crate::error::{Flyer2PdfError, TransportError};
use async_trait::async_trait;
use reqwest::header::REFERER;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const FLYER_SITE_REFERER: &str = "https://www.e.leclerc/";
const PAGES_SITE_REFERER: &str = "https://nos-catalogues-promos-v2.e.leclerc";
const STORE_QUERY: &str = "user.type:=\"pdv\" AND (user.commercialActivity.activityCode:=\"101\" \
                           OR user.commercialActivity.activityCode:=\"102\")";
/// Public key the e.Leclerc store-finder widget ships with.
pub const DEFAULT_LOCATOR_KEY: &str = "woos-6256d36f-af9b-3b64-a84f-22b2342121ba";
const LOCALITY_TYPES: &str =
    "locality|postal_code|admin_level|country|airport|metro_station|train_station";

/// Endpoints and credentials for [`LeclercCatalog`].
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Full URL of the current-operations listing (hypermarket flyers).
    pub prospectus_list_url: String,
    /// Base of `stores-by-operation-code/{id}`.
    pub operations_api_base: String,
    /// Base of `{id}/{store}` and `document/{uid}/pages`.
    pub pages_api_base: String,
    /// Base of the Woosmap `localities` and `stores` APIs.
    pub locator_api_base: String,
    /// Woosmap public key. Only the store-locator calls need it.
    /// Default: [`DEFAULT_LOCATOR_KEY`].
    pub locator_key: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            prospectus_list_url: "https://www.e.leclerc/api/rest/elpev-api/list?filters=%7B%22type%22:%7B%22value%22:%2201%22%7D,%22storePanonceauCode%22:%7B%22value%22:null%7D%7D&page=1&size=20".to_string(),
            operations_api_base: "https://www.e.leclerc/api/rest/elpev-api".to_string(),
            pages_api_base: "https://nos-catalogues-promos-v2-api.e.leclerc".to_string(),
            locator_api_base: "https://api.woosmap.com".to_string(),
            locator_key: Some(DEFAULT_LOCATOR_KEY.to_string()),
            request_timeout_secs: 30,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// [`CatalogSource`] backed by the public e.Leclerc APIs.
#[derive(Debug, Clone)]
pub struct LeclercCatalog {
    client: reqwest::Client,
    config: CatalogConfig,
}

impl LeclercCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self, Flyer2PdfError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Flyer2PdfError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Places matching a French postal code or town name.
    pub async fn search_localities(&self, input: &str) -> Result<Vec<Locality>, Flyer2PdfError> {
        let key = self.locator_key()?;
        let url = format!("{}/localities/autocomplete/", self.config.locator_api_base);
        let request = self.client.get(&url).query(&[
            ("input", input),
            ("key", key),
            ("components", "country:fr"),
            ("types", LOCALITY_TYPES),
            ("data", "advanced"),
            ("origin", "jswidget2.0"),
            ("no_deprecated_fields", "true"),
        ]);
        let body = self.send(&url, request, FLYER_SITE_REFERER).await?;
        parse_localities(&url, &body)
    }

    /// Coordinates of a locality returned by [`Self::search_localities`].
    pub async fn locality_position(&self, public_id: &str) -> Result<GeoPosition, Flyer2PdfError> {
        let key = self.locator_key()?;
        let url = format!("{}/localities/details/", self.config.locator_api_base);
        let request = self.client.get(&url).query(&[
            ("key", key),
            ("origin", "jswidget2.0"),
            ("public_id", public_id),
        ]);
        let body = self.send(&url, request, FLYER_SITE_REFERER).await?;
        parse_position(&url, &body)
    }

    /// The five hypermarkets closest to `position`.
    pub async fn nearby_stores(&self, position: GeoPosition) -> Result<Vec<Store>, Flyer2PdfError> {
        let key = self.locator_key()?;
        let url = format!("{}/stores/search", self.config.locator_api_base);
        let lat = position.lat.to_string();
        let lng = position.lng.to_string();
        let request = self.client.get(&url).query(&[
            ("key", key),
            ("lat", lat.as_str()),
            ("lng", lng.as_str()),
            ("stores_by_page", "5"),
            ("limit", "5"),
            ("page", "1"),
            ("query", STORE_QUERY),
        ]);
        let body = self.send(&url, request, FLYER_SITE_REFERER).await?;
        parse_stores(&url, &body)
    }

    fn locator_key(&self) -> Result<&str, Flyer2PdfError> {
        self.config.locator_key.as_deref().ok_or_else(|| {
            Flyer2PdfError::InvalidConfig(
                "Store search needs a Woosmap key; locator_key was cleared".into(),
            )
        })
    }

    async fn get(&self, url: &str, referer: &str) -> Result<Vec<u8>, Flyer2PdfError> {
        let request = self.client.get(url);
        self.send(url, request, referer).await
    }

    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
        referer: &str,
    ) -> Result<Vec<u8>, Flyer2PdfError> {
        debug!("GET {}", url);
        let fail = |source: TransportError| Flyer2PdfError::CatalogRequestFailed {
            url: url.to_string(),
            source,
        };
        let response = request
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| fail(e.into()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(TransportError::Status {
                status: status.as_u16(),
            }));
        }
        let body = response.bytes().await.map_err(|e| fail(e.into()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl CatalogSource for LeclercCatalog {
    async fn list_prospectuses(&self) -> Result<Vec<Prospectus>, Flyer2PdfError> {
        let url = self.config.prospectus_list_url.clone();
        let body = self.get(&url, FLYER_SITE_REFERER).await?;
        let list = parse_prospectus_list(&url, &body)?;
        info!("Catalog lists {} prospectuses", list.len());
        Ok(list)
    }

    async fn available_stores(&self, prospectus_id: &str) -> Result<Vec<String>, Flyer2PdfError> {
        let url = format!(
            "{}/stores-by-operation-code/{}",
            self.config.operations_api_base, prospectus_id
        );
        let body = self.get(&url, FLYER_SITE_REFERER).await?;
        parse_available_stores(&url, &body)
    }

    async fn page_descriptors(
        &self,
        prospectus_id: &str,
        store_id: &str,
    ) -> Result<Vec<PageDescriptor>, Flyer2PdfError> {
        let url = format!(
            "{}/{}/{}",
            self.config.pages_api_base, prospectus_id, store_id
        );
        let body = self.get(&url, PAGES_SITE_REFERER).await?;
        let uid = parse_document_uid(&url, &body)?;
        debug!("Prospectus {} for store {} is document {}", prospectus_id, store_id, uid);

        let url = format!("{}/document/{}/pages", self.config.pages_api_base, uid);
        let body = self.get(&url, PAGES_SITE_REFERER).await?;
        let pages = decode::<Vec<PageDescriptor>>(&url, &body)?;
        info!("Prospectus {} has {} pages", prospectus_id, pages.len());
        Ok(pages)
    }
}

// ── Wire formats ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListResponse {
    items: Vec<ListItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    code: String,
    title: String,
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoresResponse {
    available_stores: Vec<StoreCode>,
}

/// Store codes arrive as strings, but numbers have been seen too.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoreCode {
    Text(String),
    Number(u64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResponse {
    document_uid: String,
}

#[derive(Deserialize)]
struct LocalitiesResponse {
    localities: Vec<Locality>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    result: DetailsResult,
}

#[derive(Deserialize)]
struct DetailsResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: GeoPosition,
}

#[derive(Deserialize)]
struct StoreSearchResponse {
    features: Vec<StoreFeature>,
}

#[derive(Deserialize)]
struct StoreFeature {
    properties: StoreProperties,
}

#[derive(Deserialize)]
struct StoreProperties {
    name: String,
    user_properties: UserProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserProperties {
    sign_code: StoreCode,
}

impl StoreCode {
    fn into_string(self) -> String {
        match self {
            StoreCode::Text(s) => s,
            StoreCode::Number(n) => n.to_string(),
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, Flyer2PdfError> {
    serde_json::from_slice(body).map_err(|e| Flyer2PdfError::CatalogDecodeFailed {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

pub(crate) fn parse_prospectus_list(url: &str, body: &[u8]) -> Result<Vec<Prospectus>, Flyer2PdfError> {
    let list: ListResponse = decode(url, body)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| Prospectus {
            id: item.code,
            title: item.title,
            start: item.start_date,
            end: item.end_date,
        })
        .collect())
}

pub(crate) fn parse_available_stores(url: &str, body: &[u8]) -> Result<Vec<String>, Flyer2PdfError> {
    let stores: StoresResponse = decode(url, body)?;
    Ok(stores
        .available_stores
        .into_iter()
        .map(StoreCode::into_string)
        .collect())
}

pub(crate) fn parse_document_uid(url: &str, body: &[u8]) -> Result<String, Flyer2PdfError> {
    let doc: DocumentResponse = decode(url, body)?;
    Ok(doc.document_uid)
}

pub(crate) fn parse_localities(url: &str, body: &[u8]) -> Result<Vec<Locality>, Flyer2PdfError> {
    let r: LocalitiesResponse = decode(url, body)?;
    Ok(r.localities)
}

pub(crate) fn parse_position(url: &str, body: &[u8]) -> Result<GeoPosition, Flyer2PdfError> {
    let r: DetailsResponse = decode(url, body)?;
    Ok(r.result.geometry.location)
}

pub(crate) fn parse_stores(url: &str, body: &[u8]) -> Result<Vec<Store>, Flyer2PdfError> {
    let r: StoreSearchResponse = decode(url, body)?;
    Ok(r.features
        .into_iter()
        .map(|f| Store {
            name: f.properties.name,
            sign_code: f.properties.user_properties.sign_code.into_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prospectus_list() {
        let body = br#"{"items":[
            {"code":"24S12","title":"Printemps","startDate":"2024-03-12","endDate":"2024-03-23","type":"01"},
            {"code":"24S13","title":"Jardin","startDate":"2024-03-26","endDate":"2024-04-06"}
        ],"total":2}"#;
        let list = parse_prospectus_list("u", body).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "24S12");
        assert_eq!(list[1].title, "Jardin");
        assert_eq!(list[1].end, "2024-04-06");
    }

    #[test]
    fn parses_store_codes_of_both_shapes() {
        let body = br#"{"availableStores":["0123","4567",890]}"#;
        assert_eq!(
            parse_available_stores("u", body).unwrap(),
            vec!["0123", "4567", "890"]
        );
    }

    #[test]
    fn parses_document_uid() {
        let body = br#"{"documentUid":"a1b2-c3","other":1}"#;
        assert_eq!(parse_document_uid("u", body).unwrap(), "a1b2-c3");
    }

    #[test]
    fn parses_locator_responses() {
        let body = br#"{"localities":[{"public_id":"abc","description":"Rennes, France","types":["locality"]}]}"#;
        let l = parse_localities("u", body).unwrap();
        assert_eq!(l[0].public_id, "abc");

        let body = br#"{"result":{"geometry":{"location":{"lat":48.11,"lng":-1.68}}}}"#;
        let p = parse_position("u", body).unwrap();
        assert_eq!(p, GeoPosition { lat: 48.11, lng: -1.68 });

        let body = br#"{"features":[{"properties":{"name":"Leclerc Rennes","user_properties":{"signCode":"1234"}}}]}"#;
        let s = parse_stores("u", body).unwrap();
        assert_eq!(
            s,
            vec![Store {
                name: "Leclerc Rennes".into(),
                sign_code: "1234".into()
            }]
        );
    }

    #[test]
    fn bad_body_is_decode_error() {
        let err = parse_document_uid("https://api/x", b"<html>").unwrap_err();
        assert!(matches!(err, Flyer2PdfError::CatalogDecodeFailed { ref url, .. } if url == "https://api/x"));
    }

    #[test]
    fn default_config_carries_public_locator_key() {
        let catalog = LeclercCatalog::new(CatalogConfig::default()).unwrap();
        assert_eq!(catalog.locator_key().unwrap(), DEFAULT_LOCATOR_KEY);

        let custom = LeclercCatalog::new(CatalogConfig {
            locator_key: Some("woos-custom".into()),
            ..CatalogConfig::default()
        })
        .unwrap();
        assert_eq!(custom.locator_key().unwrap(), "woos-custom");
    }

    #[test]
    fn locator_calls_need_a_key() {
        let catalog = LeclercCatalog::new(CatalogConfig {
            locator_key: None,
            ..CatalogConfig::default()
        })
        .unwrap();
        assert!(matches!(
            catalog.locator_key(),
            Err(Flyer2PdfError::InvalidConfig(_))
        ));
    }
}
