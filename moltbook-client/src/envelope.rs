use serde_json::Value;

type Predicate = fn(&Value) -> bool;

/// One location where a response payload may keep its interesting part.
/// An empty path means the payload itself.
struct Candidate {
    path: &'static [&'static str],
    accept: Predicate,
}

fn is_list(value: &Value) -> bool {
    value.is_array()
}

fn is_object(value: &Value) -> bool {
    value.is_object()
}

fn is_post_object(value: &Value) -> bool {
    value.is_object()
        && value.get("id").is_some()
        && (value.get("title").is_some() || value.get("content").is_some())
}

/// Whether a value carries anything at all. Null, `false`, zero and
/// empty strings, arrays and objects all count as absent.
fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

// Candidate order encodes which envelope wins when several keys are
// present, so it must not be rearranged.
const POST_LIST_SOURCES: &[Candidate] = &[
    Candidate { path: &["posts"], accept: is_list },
    Candidate { path: &["results"], accept: is_list },
    Candidate { path: &["data", "posts"], accept: is_list },
    Candidate { path: &["data", "results"], accept: is_list },
    Candidate { path: &["data"], accept: is_list },
    Candidate { path: &[], accept: is_list },
];

const COMMENT_LIST_SOURCES: &[Candidate] = &[
    Candidate { path: &["comments"], accept: is_list },
    Candidate { path: &["results"], accept: is_list },
    Candidate { path: &["data", "comments"], accept: is_list },
    Candidate { path: &["data"], accept: is_list },
    Candidate { path: &[], accept: is_list },
];

const SEARCH_RESULT_SOURCES: &[Candidate] = &[
    Candidate { path: &["results"], accept: is_list },
    Candidate { path: &["data", "results"], accept: is_list },
];

const SUBMOLT_LIST_SOURCES: &[Candidate] = &[
    Candidate { path: &["submolts"], accept: is_list },
    Candidate { path: &["results"], accept: is_list },
    Candidate { path: &["data"], accept: is_list },
    Candidate { path: &["data", "submolts"], accept: is_list },
];

const POST_OBJECT_SOURCES: &[Candidate] = &[
    Candidate { path: &["post"], accept: is_object },
    Candidate { path: &["data"], accept: is_object },
    Candidate { path: &["result"], accept: is_object },
    Candidate { path: &[], accept: is_post_object },
];

fn resolve<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = payload;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn first_match<'a>(payload: &'a Value, candidates: &[Candidate]) -> Option<&'a Value> {
    candidates.iter().find_map(|candidate| {
        resolve(payload, candidate.path).filter(|value| (candidate.accept)(value))
    })
}

fn as_items(value: &Value) -> Option<&[Value]> {
    value.as_array().map(Vec::as_slice)
}

/// Finds the post list in a feed payload, whichever envelope carries it.
pub fn posts(payload: &Value) -> Option<&[Value]> {
    first_match(payload, POST_LIST_SOURCES).and_then(as_items)
}

/// Finds the comment list in a comments payload.
pub fn comments(payload: &Value) -> Option<&[Value]> {
    first_match(payload, COMMENT_LIST_SOURCES).and_then(as_items)
}

/// Finds the result list in a search payload. Search responses never
/// arrive as a bare list, so there is no top-level fallback.
pub fn search_results(payload: &Value) -> Option<&[Value]> {
    first_match(payload, SEARCH_RESULT_SOURCES).and_then(as_items)
}

/// Finds the submolt list in a directory payload.
pub fn submolts(payload: &Value) -> Option<&[Value]> {
    first_match(payload, SUBMOLT_LIST_SOURCES).and_then(as_items)
}

/// Finds a single post object, accepting a flat payload when it looks
/// like a post (an `id` plus a `title` or `content`).
pub fn post(payload: &Value) -> Option<&Value> {
    first_match(payload, POST_OBJECT_SOURCES)
}

/// Pulls the agent's name out of an identity payload. The name may sit
/// under an `agent` or `data` sub-object or at the top level, as either
/// `name` or `agent_name`. An empty `agent` or `data` container is
/// skipped, while a populated container that is not an object ends the
/// search with nothing.
pub fn agent_name(payload: &Value) -> Option<&str> {
    let container = ["agent", "data"]
        .iter()
        .find_map(|key| payload.get(*key).filter(|value| is_populated(value)))
        .unwrap_or(payload);
    let fields = container.as_object()?;
    fields
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .or_else(|| {
            fields
                .get("agent_name")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
        })
}

/// Pulls the claim status string out of a status payload.
pub fn status_claim(payload: &Value) -> Option<&str> {
    payload
        .get("status")
        .and_then(Value::as_str)
        .filter(|claim| !claim.is_empty())
        .or_else(|| {
            payload
                .get("data")?
                .get("status")
                .and_then(Value::as_str)
                .filter(|claim| !claim.is_empty())
        })
}

/// Human-readable rendering of a payload for error reporting.
pub(crate) fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post_item(id: &str) -> Value {
        json!({"id": id, "title": format!("post {}", id)})
    }

    #[test]
    fn test_posts_prefers_named_keys_in_order() {
        let payload = json!({
            "posts": [post_item("a")],
            "results": [post_item("b")],
            "data": {"posts": [post_item("c")]}
        });
        let found = posts(&payload).unwrap();
        assert_eq!(found[0]["id"], "a");

        let payload = json!({
            "results": [post_item("b")],
            "data": {"posts": [post_item("c")]}
        });
        assert_eq!(posts(&payload).unwrap()[0]["id"], "b");
    }

    #[test]
    fn test_posts_from_nested_and_bare_envelopes() {
        let nested = json!({"data": {"posts": [post_item("a")]}});
        assert_eq!(posts(&nested).unwrap().len(), 1);

        let nested_results = json!({"data": {"results": [post_item("a")]}});
        assert_eq!(posts(&nested_results).unwrap().len(), 1);

        let data_list = json!({"data": [post_item("a"), post_item("b")]});
        assert_eq!(posts(&data_list).unwrap().len(), 2);

        let bare = json!([post_item("a")]);
        assert_eq!(posts(&bare).unwrap().len(), 1);
    }

    #[test]
    fn test_posts_skips_keys_of_the_wrong_shape() {
        // A non-list `posts` key must not shadow a usable envelope
        let payload = json!({
            "posts": {"count": 3},
            "data": [post_item("a")]
        });
        assert_eq!(posts(&payload).unwrap()[0]["id"], "a");
    }

    #[test]
    fn test_posts_absent_yields_none() {
        assert!(posts(&json!({"success": true})).is_none());
        assert!(posts(&json!({"data": {"count": 0}})).is_none());
        assert!(posts(&json!(42)).is_none());
        assert!(posts(&json!(null)).is_none());
    }

    #[test]
    fn test_comments_envelopes() {
        let item = json!({"id": "c1", "content": "hi"});

        assert!(comments(&json!({"comments": [item.clone()]})).is_some());
        assert!(comments(&json!({"results": [item.clone()]})).is_some());
        assert!(comments(&json!({"data": {"comments": [item.clone()]}})).is_some());
        assert!(comments(&json!({"data": [item.clone()]})).is_some());
        assert!(comments(&json!([item.clone()])).is_some());

        // Comments never hide under data.results
        assert!(comments(&json!({"data": {"results": [item]}})).is_none());
    }

    #[test]
    fn test_search_results_have_no_bare_list_fallback() {
        let item = json!({"id": "r1"});

        assert!(search_results(&json!({"results": [item.clone()]})).is_some());
        assert!(search_results(&json!({"data": {"results": [item.clone()]}})).is_some());
        assert!(search_results(&json!([item])).is_none());
        assert!(search_results(&json!({"posts": []})).is_none());
    }

    #[test]
    fn test_submolt_envelopes_and_order() {
        let item = json!({"name": "rustlang"});

        assert!(submolts(&json!({"submolts": [item.clone()]})).is_some());
        assert!(submolts(&json!({"results": [item.clone()]})).is_some());
        assert!(submolts(&json!({"data": [item.clone()]})).is_some());
        assert!(submolts(&json!({"data": {"submolts": [item.clone()]}})).is_some());

        let both = json!({
            "results": [json!({"name": "first"})],
            "data": {"submolts": [json!({"name": "second"})]}
        });
        assert_eq!(submolts(&both).unwrap()[0]["name"], "first");
    }

    #[test]
    fn test_post_object_envelopes() {
        let payload = json!({"post": {"id": "p1", "title": "t"}});
        assert_eq!(post(&payload).unwrap()["id"], "p1");

        let payload = json!({"data": {"id": "p2", "content": "c"}});
        assert_eq!(post(&payload).unwrap()["id"], "p2");

        let payload = json!({"result": {"id": "p3", "title": "t"}});
        assert_eq!(post(&payload).unwrap()["id"], "p3");

        let flat = json!({"id": "p4", "title": "t", "score": 1});
        assert_eq!(post(&flat).unwrap()["id"], "p4");

        let flat_content = json!({"id": "p5", "content": "c"});
        assert_eq!(post(&flat_content).unwrap()["id"], "p5");

        // An id alone does not look like a post
        assert!(post(&json!({"id": "p6"})).is_none());
        assert!(post(&json!({"success": true})).is_none());
    }

    #[test]
    fn test_agent_name_containers_and_aliases() {
        assert_eq!(agent_name(&json!({"agent": {"name": "crabby"}})), Some("crabby"));
        assert_eq!(agent_name(&json!({"data": {"agent_name": "ferris"}})), Some("ferris"));
        assert_eq!(agent_name(&json!({"name": "flat"})), Some("flat"));
        assert_eq!(
            agent_name(&json!({"agent": {"name": null, "agent_name": "fallback"}})),
            Some("fallback")
        );
        assert_eq!(agent_name(&json!({"agent": {"karma": 7}})), None);
        assert_eq!(agent_name(&json!({})), None);
    }

    #[test]
    fn test_agent_name_skips_empty_containers() {
        assert_eq!(
            agent_name(&json!({"agent": {}, "data": {"name": "crabby"}})),
            Some("crabby")
        );
        assert_eq!(
            agent_name(&json!({"agent": null, "name": "flat"})),
            Some("flat")
        );
        assert_eq!(agent_name(&json!({"agent": {}, "name": "flat"})), Some("flat"));
    }

    #[test]
    fn test_agent_name_stops_at_populated_non_object_container() {
        // A bare string under `agent` wins the container slot but holds
        // no fields, so nothing falls through to `data`.
        assert_eq!(
            agent_name(&json!({"agent": "crabby", "data": {"name": "ferris"}})),
            None
        );
    }

    #[test]
    fn test_status_claim_prefers_top_level() {
        assert_eq!(status_claim(&json!({"status": "claimed"})), Some("claimed"));
        assert_eq!(
            status_claim(&json!({"data": {"status": "pending"}})),
            Some("pending")
        );
        assert_eq!(
            status_claim(&json!({"status": "top", "data": {"status": "nested"}})),
            Some("top")
        );
        assert_eq!(status_claim(&json!({"status": ""})), None);
        assert_eq!(status_claim(&json!({"data": "claimed"})), None);
        assert_eq!(status_claim(&json!({})), None);
    }
}
