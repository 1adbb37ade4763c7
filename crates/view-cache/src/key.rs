//! Fragment cache key composition.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use view_core::{RequestCulture, RequestView};

const SEPARATOR: &str = "||";
const VARY_BY: &str = "VaryBy";
const VARY_BY_COOKIE: &str = "VaryByCookie";
const VARY_BY_HEADER: &str = "VaryByHeader";
const VARY_BY_QUERY: &str = "VaryByQuery";
const VARY_BY_ROUTE: &str = "VaryByRoute";
const VARY_BY_USER: &str = "VaryByUser";
const VARY_BY_CULTURE: &str = "VaryByCulture";

/// Kind of cacheable fragment. Scopes keys so two kinds never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    /// Fragment cached in process memory.
    #[default]
    Memory,
    /// Fragment cached in a store shared between servers.
    Distributed,
}

impl FragmentKind {
    /// Literal that starts every key of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Memory => "CacheTagHelper",
            Self::Distributed => "DistributedCacheTagHelper",
        }
    }
}

/// Vary-by dimensions of a fragment.
///
/// Name lists are comma-separated. Entries are trimmed, empty entries are
/// dropped and the remaining order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaryBy {
    /// Arbitrary differentiator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Cookie names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
    /// Header names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
    /// Query parameter names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<String>,
    /// Route value names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<String>,
    /// Vary by the authenticated user name.
    pub user: bool,
    /// Vary by culture and UI culture.
    pub culture: bool,
}

/// Split a comma-separated name list, trimming entries and dropping empty ones.
pub fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn resolve<F>(list: Option<&str>, mut lookup: F) -> Vec<(String, String)>
where
    F: FnMut(&str) -> String,
{
    list.map(split_names)
        .unwrap_or_default()
        .into_iter()
        .map(|name| {
            let value = lookup(&name);
            (name, value)
        })
        .collect()
}

/// Builder for fragment cache keys.
///
/// Holds the configuration of one fragment render; `build` resolves it
/// against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    kind: FragmentKind,
    identity: String,
    vary: VaryBy,
}

impl CacheKeyBuilder {
    /// Create a builder for an in-memory fragment.
    ///
    /// `identity` is either the unique id of the markup occurrence or a
    /// caller-chosen name; it is used verbatim.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Memory,
            identity: identity.into(),
            vary: VaryBy::default(),
        }
    }

    /// Create a builder for a named fragment in a shared store.
    pub fn distributed(name: impl Into<String>) -> Self {
        Self::new(name).with_kind(FragmentKind::Distributed)
    }

    /// Set the fragment kind.
    pub fn with_kind(mut self, kind: FragmentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Replace all vary-by options.
    pub fn with_vary(mut self, vary: VaryBy) -> Self {
        self.vary = vary;
        self
    }

    /// Vary by an arbitrary value.
    pub fn vary_by(mut self, value: impl Into<String>) -> Self {
        self.vary.value = Some(value.into());
        self
    }

    /// Vary by cookies (comma-separated names).
    pub fn vary_by_cookie(mut self, names: impl Into<String>) -> Self {
        self.vary.cookies = Some(names.into());
        self
    }

    /// Vary by headers (comma-separated names).
    pub fn vary_by_header(mut self, names: impl Into<String>) -> Self {
        self.vary.headers = Some(names.into());
        self
    }

    /// Vary by query parameters (comma-separated names).
    pub fn vary_by_query(mut self, names: impl Into<String>) -> Self {
        self.vary.queries = Some(names.into());
        self
    }

    /// Vary by route values (comma-separated names).
    pub fn vary_by_route(mut self, names: impl Into<String>) -> Self {
        self.vary.routes = Some(names.into());
        self
    }

    /// Vary by the authenticated user.
    pub fn vary_by_user(mut self, enabled: bool) -> Self {
        self.vary.user = enabled;
        self
    }

    /// Vary by culture and UI culture.
    pub fn vary_by_culture(mut self, enabled: bool) -> Self {
        self.vary.culture = enabled;
        self
    }

    /// Vary-by options.
    pub fn vary(&self) -> &VaryBy {
        &self.vary
    }

    /// Resolve every dimension against a request.
    pub fn build<R>(&self, request: &R, culture: &RequestCulture) -> CacheTagKey
    where
        R: RequestView + ?Sized,
    {
        let vary = &self.vary;

        CacheTagKey {
            prefix: self.kind.prefix(),
            identity: self.identity.clone(),
            vary_by: vary.value.clone().filter(|v| !v.is_empty()),
            cookies: resolve(vary.cookies.as_deref(), |name| {
                request.cookie(name).unwrap_or_default().to_string()
            }),
            headers: resolve(vary.headers.as_deref(), |name| {
                request.header(name).unwrap_or_default()
            }),
            queries: resolve(vary.queries.as_deref(), |name| {
                request.query(name).unwrap_or_default()
            }),
            routes: resolve(vary.routes.as_deref(), |name| {
                request
                    .route_value(name)
                    .map(|v| v.to_invariant_string())
                    .unwrap_or_default()
            }),
            user: vary
                .user
                .then(|| request.user_name().unwrap_or_default().to_string()),
            culture: vary.culture.then(|| culture.clone()),
        }
    }

    /// Resolve and format the key in one step.
    pub fn generate_key<R>(&self, request: &R, culture: &RequestCulture) -> String
    where
        R: RequestView + ?Sized,
    {
        self.build(request, culture).generate_key()
    }
}

/// A resolved fragment cache key.
///
/// Equality and hashing compare the resolved segments, not the formatted
/// string. Culture only takes part when the key varies by culture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheTagKey {
    prefix: &'static str,
    identity: String,
    vary_by: Option<String>,
    cookies: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    queries: Vec<(String, String)>,
    routes: Vec<(String, String)>,
    user: Option<String>,
    culture: Option<RequestCulture>,
}

impl CacheTagKey {
    /// Fragment identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Format the key.
    ///
    /// Segments are joined by `||` in a fixed order; unset dimensions are
    /// omitted.
    pub fn generate_key(&self) -> String {
        let mut key = String::with_capacity(64);
        key.push_str(self.prefix);
        key.push_str(SEPARATOR);
        key.push_str(&self.identity);

        if let Some(value) = &self.vary_by {
            push_segment(&mut key, VARY_BY, &[value.as_str()]);
        }

        push_collection(&mut key, VARY_BY_COOKIE, &self.cookies);
        push_collection(&mut key, VARY_BY_HEADER, &self.headers);
        push_collection(&mut key, VARY_BY_QUERY, &self.queries);
        push_collection(&mut key, VARY_BY_ROUTE, &self.routes);

        if let Some(user) = &self.user {
            push_segment(&mut key, VARY_BY_USER, &[user.as_str()]);
        }

        if let Some(culture) = &self.culture {
            push_segment(
                &mut key,
                VARY_BY_CULTURE,
                &[culture.culture.as_str(), culture.ui_culture.as_str()],
            );
        }

        key
    }

    /// SHA-256 of the key, base64 encoded. Fixed length, suitable for stores
    /// that limit key size.
    pub fn generate_hashed_key(&self) -> String {
        let digest = Sha256::digest(self.generate_key().as_bytes());
        STANDARD.encode(digest)
    }
}

fn push_segment(key: &mut String, name: &str, values: &[&str]) {
    key.push_str(SEPARATOR);
    key.push_str(name);
    for value in values {
        key.push_str(SEPARATOR);
        key.push_str(value);
    }
}

fn push_collection(key: &mut String, name: &str, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }

    key.push_str(SEPARATOR);
    key.push_str(name);
    key.push('(');
    for (i, (k, v)) in pairs.iter().enumerate() {
        if i > 0 {
            key.push_str(SEPARATOR);
        }
        key.push_str(k);
        key.push_str(SEPARATOR);
        key.push_str(v);
    }
    key.push(')');
}

impl fmt::Display for CacheTagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.generate_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use chrono::DateTime;
    use view_core::{RequestContext, UserIdentity};

    fn hash_of(key: &CacheTagKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn invariant() -> RequestCulture {
        RequestCulture::invariant()
    }

    #[test]
    fn test_key_without_vary() {
        let key = CacheKeyBuilder::new("some-id").build(&RequestContext::default(), &invariant());
        assert_eq!(key.generate_key(), "CacheTagHelper||some-id");
    }

    #[test]
    fn test_distributed_prefix() {
        let key = CacheKeyBuilder::distributed("my-fragment")
            .generate_key(&RequestContext::default(), &invariant());
        assert_eq!(key, "DistributedCacheTagHelper||my-fragment");
    }

    #[test]
    fn test_vary_by_value() {
        let key = CacheKeyBuilder::new("id")
            .vary_by("some-value")
            .generate_key(&RequestContext::default(), &invariant());
        assert_eq!(key, "CacheTagHelper||id||VaryBy||some-value");
    }

    #[test]
    fn test_empty_vary_by_value_omits_segment() {
        let empty = CacheKeyBuilder::new("id").vary_by("");
        assert_eq!(
            empty.generate_key(&RequestContext::default(), &invariant()),
            "CacheTagHelper||id"
        );
        assert_eq!(
            empty.build(&RequestContext::default(), &invariant()),
            CacheKeyBuilder::new("id").build(&RequestContext::default(), &invariant())
        );
    }

    #[test]
    fn test_vary_by_cookie_keeps_given_order() {
        let ctx = RequestContext::new("/")
            .with_cookie("Cookie0", "Cookie0Value")
            .with_cookie("Cookie1", "Cookie1Value");
        let key = CacheKeyBuilder::new("id")
            .vary_by_cookie("Cookie1,Cookie0,Cookie2")
            .generate_key(&ctx, &invariant());
        assert_eq!(
            key,
            "CacheTagHelper||id||VaryByCookie(Cookie1||Cookie1Value||Cookie0||Cookie0Value||Cookie2||)"
        );
    }

    #[test]
    fn test_name_lists_ignore_whitespace_and_empty_entries() {
        let ctx = RequestContext::new("/")
            .with_cookie("Cookie0", "a")
            .with_cookie("Cookie1", "b");

        let keys: Vec<String> = ["Cookie0, Cookie1", "Cookie0,Cookie1", "  Cookie0,  , Cookie1  "]
            .iter()
            .map(|list| {
                CacheKeyBuilder::new("id")
                    .vary_by_cookie(*list)
                    .generate_key(&ctx, &invariant())
            })
            .collect();

        assert_eq!(keys[0], "CacheTagHelper||id||VaryByCookie(Cookie0||a||Cookie1||b)");
        assert_eq!(keys[0], keys[1]);
        assert_eq!(keys[1], keys[2]);
    }

    #[test]
    fn test_empty_name_list_omits_segment() {
        let key = CacheKeyBuilder::new("id")
            .vary_by_header(" , ,")
            .generate_key(&RequestContext::default(), &invariant());
        assert_eq!(key, "CacheTagHelper||id");
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let ctx = RequestContext::new("/").with_query("page", "2");
        let key = CacheKeyBuilder::new("id")
            .vary_by_query("page,page")
            .generate_key(&ctx, &invariant());
        assert_eq!(key, "CacheTagHelper||id||VaryByQuery(page||2||page||2)");
    }

    #[test]
    fn test_vary_by_header_is_case_insensitive() {
        let ctx = RequestContext::new("/")
            .with_header("Accept-Language", "en-US")
            .with_header("Content-Type", "text/html");
        let key = CacheKeyBuilder::new("id")
            .vary_by_header("content-type,ACCEPT-LANGUAGE,X-Missing")
            .generate_key(&ctx, &invariant());
        assert_eq!(
            key,
            "CacheTagHelper||id||VaryByHeader(content-type||text/html||ACCEPT-LANGUAGE||en-US||X-Missing||)"
        );
    }

    #[test]
    fn test_vary_by_query() {
        let ctx = RequestContext::new("/").with_query_string("Category=cats&Page=3");
        let key = CacheKeyBuilder::new("id")
            .vary_by_query("category, page")
            .generate_key(&ctx, &invariant());
        assert_eq!(key, "CacheTagHelper||id||VaryByQuery(category||cats||page||3)");
    }

    #[test]
    fn test_vary_by_route_uses_invariant_formatting() {
        let dt = DateTime::parse_from_rfc3339("2018-10-31T07:37:38-07:00").unwrap();
        let ctx = RequestContext::new("/")
            .with_route_value("id", 4i64)
            .with_route_value("when", dt)
            .with_route_value("ratio", 0.25);
        let builder = CacheKeyBuilder::new("id").vary_by_route("when,id,ratio,missing");

        let expected = "CacheTagHelper||id||VaryByRoute(when||10/31/2018 07:37:38 -07:00||id||4||ratio||0.25||missing||)";
        assert_eq!(builder.generate_key(&ctx, &invariant()), expected);
        assert_eq!(
            builder.generate_key(&ctx, &RequestCulture::single("fr-FR")),
            expected
        );
    }

    #[test]
    fn test_vary_by_user() {
        let builder = CacheKeyBuilder::new("id").vary_by_user(true);

        let anon = RequestContext::new("/");
        assert_eq!(
            builder.generate_key(&anon, &invariant()),
            "CacheTagHelper||id||VaryByUser||"
        );

        let alice = RequestContext::new("/").with_user(UserIdentity::authenticated("alice"));
        assert_eq!(
            builder.generate_key(&alice, &invariant()),
            "CacheTagHelper||id||VaryByUser||alice"
        );
    }

    #[test]
    fn test_vary_by_culture() {
        let key = CacheKeyBuilder::new("id")
            .vary_by_culture(true)
            .generate_key(&RequestContext::default(), &RequestCulture::new("fr-FR", "es-ES"));
        assert_eq!(key, "CacheTagHelper||id||VaryByCulture||fr-FR||es-ES");
    }

    #[test]
    fn test_segment_order_is_fixed() {
        let ctx = RequestContext::new("/")
            .with_cookie("c", "1")
            .with_header("h", "2")
            .with_query("q", "3")
            .with_route_value("r", "4")
            .with_user(UserIdentity::authenticated("u"));
        let vary = VaryBy {
            value: Some("v".to_string()),
            cookies: Some("c".to_string()),
            headers: Some("h".to_string()),
            queries: Some("q".to_string()),
            routes: Some("r".to_string()),
            user: true,
            culture: true,
        };
        let key = CacheKeyBuilder::new("id")
            .with_vary(vary)
            .generate_key(&ctx, &RequestCulture::new("en-US", "en-GB"));
        assert_eq!(
            key,
            "CacheTagHelper||id||VaryBy||v||VaryByCookie(c||1)||VaryByHeader(h||2)||VaryByQuery(q||3)||VaryByRoute(r||4)||VaryByUser||u||VaryByCulture||en-US||en-GB"
        );
    }

    #[test]
    fn test_generate_key_is_deterministic() {
        let ctx = RequestContext::new("/").with_cookie("a", "b");
        let key = CacheKeyBuilder::new("id")
            .vary_by_cookie("a")
            .build(&ctx, &invariant());
        assert_eq!(key.generate_key(), key.generate_key());
        assert_eq!(key.to_string(), key.generate_key());
    }

    #[test]
    fn test_equal_keys_for_equal_inputs() {
        let ctx = RequestContext::new("/").with_header("h", "1");
        let builder = CacheKeyBuilder::new("id").vary_by_header("h");
        let a = builder.build(&ctx, &invariant());
        let b = builder.build(&ctx.clone(), &invariant());
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_different_identities_are_not_equal() {
        let ctx = RequestContext::default();
        let a = CacheKeyBuilder::new("one").build(&ctx, &invariant());
        let b = CacheKeyBuilder::new("two").build(&ctx, &invariant());
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_name_collides_across_renders() {
        let ctx = RequestContext::default();
        let a = CacheKeyBuilder::distributed("shared").build(&ctx, &invariant());
        let b = CacheKeyBuilder::distributed("shared").build(&ctx, &invariant());
        assert_eq!(a, b);
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let ctx = RequestContext::default();
        let a = CacheKeyBuilder::new("name").build(&ctx, &invariant());
        let b = CacheKeyBuilder::distributed("name").build(&ctx, &invariant());
        assert_ne!(a, b);
    }

    #[test]
    fn test_culture_ignored_unless_varying_by_culture() {
        let ctx = RequestContext::default();
        let builder = CacheKeyBuilder::new("id");
        let a = builder.build(&ctx, &RequestCulture::single("fr-FR"));
        let b = builder.build(&ctx, &RequestCulture::single("es-ES"));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_culture_matters_when_varying_by_culture() {
        let ctx = RequestContext::default();
        let builder = CacheKeyBuilder::new("id").vary_by_culture(true);
        let a = builder.build(&ctx, &RequestCulture::single("fr-FR"));
        let b = builder.build(&ctx, &RequestCulture::single("es-ES"));
        assert_ne!(a, b);
        assert_ne!(hash_of(&a), hash_of(&b));

        let ui_only = builder.build(&ctx, &RequestCulture::new("fr-FR", "es-ES"));
        assert_ne!(a, ui_only);
    }

    #[test]
    fn test_hashed_key() {
        let ctx = RequestContext::default();
        let a = CacheKeyBuilder::distributed("a").build(&ctx, &invariant());
        let b = CacheKeyBuilder::distributed("b").build(&ctx, &invariant());

        let hashed = a.generate_hashed_key();
        assert_eq!(hashed, a.generate_hashed_key());
        assert_ne!(hashed, b.generate_hashed_key());
        // 32 bytes, padded base64
        assert_eq!(hashed.len(), 44);
        assert!(hashed.ends_with('='));
    }

    #[test]
    fn test_vary_by_deserializes() {
        let vary: VaryBy = serde_json::from_str(
            r#"{"cookies": "a, b", "user": true}"#,
        )
        .unwrap();
        assert_eq!(vary.cookies.as_deref(), Some("a, b"));
        assert!(vary.user);
        assert!(!vary.culture);
        assert_eq!(vary.headers, None);
    }

    #[test]
    fn test_split_names() {
        assert_eq!(split_names(" a ,, b,a "), vec!["a", "b", "a"]);
        assert!(split_names("").is_empty());
    }
}
