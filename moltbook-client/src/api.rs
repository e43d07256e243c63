//! Endpoint operations of the Moltbook REST API, one method per endpoint.
//!
//! List-returning operations run their payloads through the envelope
//! normalizer; the rest hand back the raw body for display. Submolt name
//! arguments tolerate the `m/` display prefix.

use crate::envelope;
use crate::http::{ApiResponse, FilePayload, MoltbookClient, RequestOptions};
use moltbook_core::{normalize_submolt, ApiError, CoreError, MediaKind, SearchKind, SortOrder};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// Identity established when connecting: whatever the profile and status
/// endpoints were willing to reveal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectedAgent {
    pub agent_name: Option<String>,
    pub status: Option<String>,
}

/// Result of listing a post's comments. Some deployments answer 405 for
/// the listing endpoint; that is an outcome of its own, not an error, so
/// the caller can fall back to the post view.
#[derive(Debug, Clone)]
pub enum CommentsOutcome {
    Comments(Vec<Value>),
    ListingUnsupported(Value),
}

/// Fields understood by the submolt settings endpoint. Absent fields are
/// left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmoltSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
}

fn require(value: &str, what: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidInput {
            message: format!("{} must not be empty", what),
        });
    }
    Ok(())
}

fn required_submolt(name: &str) -> Result<String, CoreError> {
    let normalized = normalize_submolt(name);
    require(&normalized, "submolt name")?;
    Ok(normalized)
}

fn shape_error(what: &'static str, payload: &Value) -> CoreError {
    ApiError::UnexpectedShape {
        what,
        payload: envelope::pretty_json(payload),
    }
    .into()
}

fn posts_from(body: Value) -> Result<Vec<Value>, CoreError> {
    let posts = envelope::posts(&body)
        .ok_or_else(|| shape_error("posts", &body))?
        .to_vec();
    Ok(posts)
}

// The submolt feed endpoint only understands hot/new/top; anything else
// falls back to new.
fn submolt_feed_sort(sort: SortOrder) -> SortOrder {
    match sort {
        SortOrder::Hot | SortOrder::New | SortOrder::Top => sort,
        SortOrder::Rising => SortOrder::New,
    }
}

impl MoltbookClient {
    async fn request_ok(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, CoreError> {
        self.send(method, path, options).await?.into_result(&[200])
    }

    // Creation endpoints answer 200 or 201 depending on deployment.
    async fn request_created(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, CoreError> {
        self.send(method, path, options)
            .await?
            .into_result(&[200, 201])
    }

    // ---- Agents

    /// Profile of the agent the API key belongs to.
    pub async fn me(&self) -> Result<Value, CoreError> {
        self.request_ok(Method::GET, "/agents/me", RequestOptions::new())
            .await
    }

    /// Platform status endpoint. Deployments disagree on its shape and
    /// status code, so the raw response is handed back unchecked.
    pub async fn status(&self) -> Result<ApiResponse, CoreError> {
        self.send(Method::GET, "/agents/status", RequestOptions::new())
            .await
    }

    /// Validates the configured key against the profile endpoint and
    /// picks up the agent's name plus any status claim.
    pub async fn connect(&self) -> Result<ConnectedAgent, CoreError> {
        let me = self.me().await?;
        let agent_name = envelope::agent_name(&me).map(str::to_string);

        let status = self.status().await?;
        let status_claim = envelope::status_claim(&status.body).map(str::to_string);

        if let Some(name) = &agent_name {
            info!("Connected to Moltbook as {}", name);
        }

        Ok(ConnectedAgent {
            agent_name,
            status: status_claim,
        })
    }

    pub async fn agent_profile(&self, name: &str) -> Result<Value, CoreError> {
        require(name, "agent name")?;
        self.request_ok(
            Method::GET,
            "/agents/profile",
            RequestOptions::new().with_param("name", name),
        )
        .await
    }

    pub async fn follow_agent(&self, name: &str) -> Result<Value, CoreError> {
        require(name, "agent name")?;
        self.request_ok(
            Method::POST,
            &format!("/agents/{}/follow", name),
            RequestOptions::new().with_json(json!({})),
        )
        .await
    }

    pub async fn unfollow_agent(&self, name: &str) -> Result<Value, CoreError> {
        require(name, "agent name")?;
        self.request_ok(
            Method::DELETE,
            &format!("/agents/{}/follow", name),
            RequestOptions::new(),
        )
        .await
    }

    /// Updates the agent's own profile. Only the supplied fields are
    /// sent; `None` leaves the server-side value untouched.
    pub async fn update_me(
        &self,
        description: Option<&str>,
        metadata: Option<Value>,
    ) -> Result<Value, CoreError> {
        let mut payload = Map::new();
        if let Some(description) = description {
            payload.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
        }
        if let Some(metadata) = metadata {
            payload.insert("metadata".to_string(), metadata);
        }
        self.request_ok(
            Method::PATCH,
            "/agents/me",
            RequestOptions::new().with_json(Value::Object(payload)),
        )
        .await
    }

    pub async fn upload_my_avatar(&self, path: &Path) -> Result<Value, CoreError> {
        let file = FilePayload::read(path).await?;
        self.request_ok(
            Method::POST,
            "/agents/me/avatar",
            RequestOptions::new().with_file(file),
        )
        .await
    }

    pub async fn remove_my_avatar(&self) -> Result<Value, CoreError> {
        self.request_ok(Method::DELETE, "/agents/me/avatar", RequestOptions::new())
            .await
    }

    // ---- Posts

    /// The public feed, optionally filtered to one submolt.
    pub async fn feed_posts(
        &self,
        sort: SortOrder,
        limit: u32,
        submolt: Option<&str>,
    ) -> Result<Vec<Value>, CoreError> {
        let mut options = RequestOptions::new()
            .with_param("sort", sort.as_str())
            .with_param("limit", &limit.to_string());
        let submolt = submolt.map(normalize_submolt).filter(|s| !s.is_empty());
        if let Some(name) = &submolt {
            options = options.with_param("submolt", name);
        }
        let body = self.request_ok(Method::GET, "/posts", options).await?;
        posts_from(body)
    }

    /// The feed personalized to the connected agent's subscriptions.
    pub async fn personalized_feed(
        &self,
        sort: SortOrder,
        limit: u32,
    ) -> Result<Vec<Value>, CoreError> {
        let options = RequestOptions::new()
            .with_param("sort", sort.as_str())
            .with_param("limit", &limit.to_string());
        let body = self.request_ok(Method::GET, "/feed", options).await?;
        posts_from(body)
    }

    pub async fn submolt_feed(
        &self,
        submolt: &str,
        sort: SortOrder,
        limit: u32,
    ) -> Result<Vec<Value>, CoreError> {
        let submolt = required_submolt(submolt)?;
        let options = RequestOptions::new()
            .with_param("sort", submolt_feed_sort(sort).as_str())
            .with_param("limit", &limit.to_string());
        let body = self
            .request_ok(Method::GET, &format!("/submolts/{}/feed", submolt), options)
            .await?;
        posts_from(body)
    }

    /// Fetches one post, normalized to the inner post object.
    pub async fn get_post(&self, post_id: &str) -> Result<Value, CoreError> {
        require(post_id, "post id")?;
        let body = self
            .request_ok(
                Method::GET,
                &format!("/posts/{}", post_id),
                RequestOptions::new(),
            )
            .await?;
        let post = envelope::post(&body)
            .cloned()
            .ok_or_else(|| shape_error("post", &body))?;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        submolt: &str,
        title: &str,
        content: Option<&str>,
        url: Option<&str>,
    ) -> Result<Value, CoreError> {
        let submolt = required_submolt(submolt)?;
        let title = title.trim();
        require(title, "post title")?;

        let mut payload = Map::new();
        payload.insert("submolt".to_string(), Value::String(submolt));
        payload.insert("title".to_string(), Value::String(title.to_string()));
        if let Some(content) = content.map(str::trim).filter(|c| !c.is_empty()) {
            payload.insert("content".to_string(), Value::String(content.to_string()));
        }
        if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
            payload.insert("url".to_string(), Value::String(url.to_string()));
        }
        self.request_created(
            Method::POST,
            "/posts",
            RequestOptions::new().with_json(Value::Object(payload)),
        )
        .await
    }

    pub async fn delete_post(&self, post_id: &str) -> Result<Value, CoreError> {
        require(post_id, "post id")?;
        self.request_ok(
            Method::DELETE,
            &format!("/posts/{}", post_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn upvote_post(&self, post_id: &str) -> Result<Value, CoreError> {
        require(post_id, "post id")?;
        self.request_ok(
            Method::POST,
            &format!("/posts/{}/upvote", post_id),
            RequestOptions::new().with_json(json!({})),
        )
        .await
    }

    pub async fn downvote_post(&self, post_id: &str) -> Result<Value, CoreError> {
        require(post_id, "post id")?;
        self.request_ok(
            Method::POST,
            &format!("/posts/{}/downvote", post_id),
            RequestOptions::new().with_json(json!({})),
        )
        .await
    }

    pub async fn pin_post(&self, post_id: &str) -> Result<Value, CoreError> {
        require(post_id, "post id")?;
        self.request_ok(
            Method::POST,
            &format!("/posts/{}/pin", post_id),
            RequestOptions::new().with_json(json!({})),
        )
        .await
    }

    pub async fn unpin_post(&self, post_id: &str) -> Result<Value, CoreError> {
        require(post_id, "post id")?;
        self.request_ok(
            Method::DELETE,
            &format!("/posts/{}/pin", post_id),
            RequestOptions::new(),
        )
        .await
    }

    // ---- Comments

    pub async fn comments(
        &self,
        post_id: &str,
        sort: SortOrder,
    ) -> Result<CommentsOutcome, CoreError> {
        require(post_id, "post id")?;
        let response = self
            .send(
                Method::GET,
                &format!("/posts/{}/comments", post_id),
                RequestOptions::new().with_param("sort", sort.as_str()),
            )
            .await?;
        if response.status == 405 {
            info!("Comment listing unsupported for post {}", post_id);
            return Ok(CommentsOutcome::ListingUnsupported(response.body));
        }
        let body = response.into_result(&[200])?;
        let comments = envelope::comments(&body)
            .ok_or_else(|| shape_error("comments", &body))?
            .to_vec();
        Ok(CommentsOutcome::Comments(comments))
    }

    pub async fn add_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<Value, CoreError> {
        require(post_id, "post id")?;
        let content = content.trim();
        require(content, "comment content")?;

        let mut payload = Map::new();
        payload.insert("content".to_string(), Value::String(content.to_string()));
        if let Some(parent) = parent_id.map(str::trim).filter(|p| !p.is_empty()) {
            payload.insert("parent_id".to_string(), Value::String(parent.to_string()));
        }
        self.request_created(
            Method::POST,
            &format!("/posts/{}/comments", post_id),
            RequestOptions::new().with_json(Value::Object(payload)),
        )
        .await
    }

    pub async fn upvote_comment(&self, comment_id: &str) -> Result<Value, CoreError> {
        require(comment_id, "comment id")?;
        self.request_ok(
            Method::POST,
            &format!("/comments/{}/upvote", comment_id),
            RequestOptions::new().with_json(json!({})),
        )
        .await
    }

    // ---- Search

    /// Semantic search across the platform. The backend intermittently
    /// answers 500 for `type=all`; narrowing to posts usually succeeds,
    /// so that is tried once before giving up.
    pub async fn semantic_search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> Result<Vec<Value>, CoreError> {
        let query = query.trim();
        require(query, "search query")?;

        let mut response = self.search_once(query, kind, limit).await?;
        if response.status == 500 && kind == SearchKind::All {
            warn!("Search returned HTTP 500 for type=all, retrying with type=posts");
            response = self.search_once(query, SearchKind::Posts, limit).await?;
        }
        let body = response.into_result(&[200])?;
        let results = envelope::search_results(&body)
            .ok_or_else(|| shape_error("search results", &body))?
            .to_vec();
        Ok(results)
    }

    async fn search_once(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> Result<ApiResponse, CoreError> {
        let options = RequestOptions::new()
            .with_param("q", query)
            .with_param("limit", &limit.to_string())
            .with_param("type", kind.as_str());
        self.send(Method::GET, "/search", options).await
    }

    // ---- Submolts

    pub async fn list_submolts(&self) -> Result<Vec<Value>, CoreError> {
        let body = self
            .request_ok(Method::GET, "/submolts", RequestOptions::new())
            .await?;
        let submolts = envelope::submolts(&body)
            .ok_or_else(|| shape_error("submolts", &body))?
            .to_vec();
        Ok(submolts)
    }

    pub async fn get_submolt(&self, name: &str) -> Result<Value, CoreError> {
        let name = required_submolt(name)?;
        self.request_ok(
            Method::GET,
            &format!("/submolts/{}", name),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn create_submolt(
        &self,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<Value, CoreError> {
        let name = required_submolt(name)?;
        let payload = json!({
            "name": name,
            "display_name": display_name,
            "description": description,
        });
        self.request_created(
            Method::POST,
            "/submolts",
            RequestOptions::new().with_json(payload),
        )
        .await
    }

    pub async fn subscribe_submolt(&self, name: &str) -> Result<Value, CoreError> {
        let name = required_submolt(name)?;
        self.request_ok(
            Method::POST,
            &format!("/submolts/{}/subscribe", name),
            RequestOptions::new().with_json(json!({})),
        )
        .await
    }

    pub async fn unsubscribe_submolt(&self, name: &str) -> Result<Value, CoreError> {
        let name = required_submolt(name)?;
        self.request_ok(
            Method::DELETE,
            &format!("/submolts/{}/subscribe", name),
            RequestOptions::new(),
        )
        .await
    }

    // ---- Moderation

    pub async fn update_submolt_settings(
        &self,
        name: &str,
        patch: SubmoltSettingsPatch,
    ) -> Result<Value, CoreError> {
        let name = required_submolt(name)?;
        let payload = serde_json::to_value(&patch)?;
        self.request_ok(
            Method::PATCH,
            &format!("/submolts/{}/settings", name),
            RequestOptions::new().with_json(payload),
        )
        .await
    }

    /// Uploads a submolt avatar or banner. The settings endpoint doubles
    /// as the media endpoint, keyed by the `type` form field.
    pub async fn upload_submolt_media(
        &self,
        name: &str,
        path: &Path,
        kind: MediaKind,
    ) -> Result<Value, CoreError> {
        let name = required_submolt(name)?;
        let file = FilePayload::read(path).await?;
        let options = RequestOptions::new()
            .with_file(file)
            .with_form_field("type", kind.as_str());
        self.request_ok(
            Method::POST,
            &format!("/submolts/{}/settings", name),
            options,
        )
        .await
    }

    pub async fn add_moderator(
        &self,
        submolt: &str,
        agent_name: &str,
        role: &str,
    ) -> Result<Value, CoreError> {
        let submolt = required_submolt(submolt)?;
        require(agent_name, "agent name")?;
        let payload = json!({"agent_name": agent_name, "role": role});
        self.request_ok(
            Method::POST,
            &format!("/submolts/{}/moderators", submolt),
            RequestOptions::new().with_json(payload),
        )
        .await
    }

    pub async fn remove_moderator(
        &self,
        submolt: &str,
        agent_name: &str,
    ) -> Result<Value, CoreError> {
        let submolt = required_submolt(submolt)?;
        require(agent_name, "agent name")?;
        self.request_ok(
            Method::DELETE,
            &format!("/submolts/{}/moderators", submolt),
            RequestOptions::new().with_json(json!({"agent_name": agent_name})),
        )
        .await
    }

    pub async fn list_moderators(&self, submolt: &str) -> Result<Value, CoreError> {
        let submolt = required_submolt(submolt)?;
        self.request_ok(
            Method::GET,
            &format!("/submolts/{}/moderators", submolt),
            RequestOptions::new(),
        )
        .await
    }
}
