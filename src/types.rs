use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Naive layouts some backends emit; they are read as UTC.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 timestamp, falling back to offset-less forms taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{raw}'")))
}

/// The caller's own mark on a post.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserReaction {
    Like,
    Dislike,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub email: String,
    pub content: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
    pub likes: u64,
    pub dislikes: u64,
    #[serde(default)]
    pub user_reaction: Option<UserReaction>,
}

impl Post {
    /// Mirror a server-side reaction outcome onto a locally held copy.
    ///
    /// Counters move with the transition from the old `user_reaction` to the
    /// one implied by `action` and never go below zero.
    pub fn apply_reaction(&mut self, action: ReactionAction) {
        let next = action.resulting_reaction();
        if self.user_reaction == next {
            return;
        }
        match self.user_reaction {
            Some(UserReaction::Like) => self.likes = self.likes.saturating_sub(1),
            Some(UserReaction::Dislike) => self.dislikes = self.dislikes.saturating_sub(1),
            None => {}
        }
        match next {
            Some(UserReaction::Like) => self.likes += 1,
            Some(UserReaction::Dislike) => self.dislikes += 1,
            None => {}
        }
        self.user_reaction = next;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// Build a descriptor with the derived fields filled in.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64).min(u32::MAX as u64) as u32
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }

    /// True when the derived fields agree with page/limit/total.
    pub fn is_consistent(&self) -> bool {
        *self == Self::new(self.page, self.limit, self.total)
    }
}

/// Optional paging parameters; absent fields are left out of the query string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self { page, limit }
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.limit.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostsResponse {
    pub success: bool,
    pub data: Vec<Post>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Post>,
}

impl PostResponse {
    pub fn into_post(self) -> Option<Post> {
        self.data
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "VNDC")]
    Vndc,
    #[serde(rename = "USDT")]
    Usdt,
}

impl std::str::FromStr for Currency {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "VNDC" => Ok(Currency::Vndc),
            "USDT" => Ok(Currency::Usdt),
            _ => Err(anyhow::anyhow!(
                "Invalid currency '{s}'. Valid options: VNDC, USDT"
            )),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Vndc => write!(f, "VNDC"),
            Currency::Usdt => write!(f, "USDT"),
        }
    }
}

/// Body of `POST /posts`. The bearer token travels in the header only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub amount: f64,
    pub currency: Currency,
    #[serde(rename = "appSessionId")]
    pub app_session_id: String,
}

/// What the server did in response to a like/dislike toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Liked,
    Disliked,
    Removed,
}

impl ReactionAction {
    pub fn resulting_reaction(self) -> Option<UserReaction> {
        match self {
            ReactionAction::Liked => Some(UserReaction::Like),
            ReactionAction::Disliked => Some(UserReaction::Dislike),
            ReactionAction::Removed => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub action: ReactionAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MyReactions {
    pub liked_posts: Vec<Post>,
    pub disliked_posts: Vec<Post>,
    pub total_liked: u64,
    pub total_disliked: u64,
    pub total_reactions: u64,
}

impl MyReactions {
    pub fn is_consistent(&self) -> bool {
        self.total_liked.checked_add(self.total_disliked) == Some(self.total_reactions)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MyReactionsResponse {
    pub success: bool,
    pub data: MyReactions,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(reaction: Option<UserReaction>, likes: u64, dislikes: u64) -> Post {
        Post {
            id: "42".into(),
            email: "a@example.com".into(),
            content: "hello".into(),
            created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            updated_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            likes,
            dislikes,
            user_reaction: reaction,
        }
    }

    #[test]
    fn test_pagination_derived_fields() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(!p.has_prev_page);

        let last = Pagination::new(3, 10, 25);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let exact = Pagination::new(2, 10, 20);
        assert_eq!(exact.total_pages, 2);
        assert!(!exact.has_next_page);
    }

    #[test]
    fn test_pagination_empty_and_zero_limit() {
        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);

        let zero = Pagination::new(1, 0, 5);
        assert_eq!(zero.total_pages, 0);
    }

    #[test]
    fn test_pagination_consistency_check() {
        assert!(Pagination::new(2, 5, 11).is_consistent());
        let mut bad = Pagination::new(2, 5, 11);
        bad.has_prev_page = false;
        assert!(!bad.is_consistent());
    }

    #[test]
    fn test_page_query_skips_absent_fields() {
        let q = serde_json::to_value(PageQuery::new(Some(2), None)).unwrap();
        assert_eq!(q, json!({"page": 2}));
        let q = serde_json::to_value(PageQuery::default()).unwrap();
        assert_eq!(q, json!({}));
        assert!(PageQuery::default().is_empty());
    }

    #[test]
    fn test_create_request_body_keys() {
        let req = CreatePostRequest {
            content: "gm".into(),
            amount: 1.5,
            currency: Currency::Usdt,
            app_session_id: "s1".into(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({"content": "gm", "amount": 1.5, "currency": "USDT", "appSessionId": "s1"})
        );
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("vndc".parse::<Currency>().unwrap(), Currency::Vndc);
        assert_eq!("USDT".parse::<Currency>().unwrap(), Currency::Usdt);
        assert!("EUR".parse::<Currency>().is_err());
        assert_eq!(Currency::Vndc.to_string(), "VNDC");
    }

    #[test]
    fn test_post_deserializes_null_reaction() {
        let v = json!({
            "id": "1",
            "email": "a@example.com",
            "content": "x",
            "created_at": "2024-05-01T10:00:00.000Z",
            "updated_at": "2024-05-01T11:00:00.000Z",
            "likes": 3,
            "dislikes": 0,
            "user_reaction": null
        });
        let p: Post = serde_json::from_value(v).unwrap();
        assert_eq!(p.user_reaction, None);

        let v = json!({
            "id": "1",
            "email": "a@example.com",
            "content": "x",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z",
            "likes": 3,
            "dislikes": 0,
            "user_reaction": "dislike"
        });
        let p: Post = serde_json::from_value(v).unwrap();
        assert_eq!(p.user_reaction, Some(UserReaction::Dislike));
    }

    #[test]
    fn test_unknown_reaction_is_rejected() {
        let r = serde_json::from_value::<ReactionResponse>(
            json!({"success": true, "message": "", "action": "loved"}),
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_apply_reaction_transitions() {
        let mut p = post(None, 0, 0);
        p.apply_reaction(ReactionAction::Liked);
        assert_eq!((p.user_reaction, p.likes, p.dislikes), (Some(UserReaction::Like), 1, 0));

        // switching sides moves one count across
        p.apply_reaction(ReactionAction::Disliked);
        assert_eq!((p.user_reaction, p.likes, p.dislikes), (Some(UserReaction::Dislike), 0, 1));

        p.apply_reaction(ReactionAction::Removed);
        assert_eq!((p.user_reaction, p.likes, p.dislikes), (None, 0, 0));

        // repeated outcome is idempotent
        let mut q = post(Some(UserReaction::Like), 4, 0);
        q.apply_reaction(ReactionAction::Liked);
        assert_eq!(q.likes, 4);
    }

    #[test]
    fn test_my_reactions_consistency() {
        let r = MyReactions {
            liked_posts: vec![post(Some(UserReaction::Like), 1, 0)],
            disliked_posts: vec![],
            total_liked: 1,
            total_disliked: 0,
            total_reactions: 1,
        };
        assert!(r.is_consistent());
        let bad = MyReactions { total_reactions: 3, ..r };
        assert!(!bad.is_consistent());
    }

    #[test]
    fn test_my_reactions_huge_counters_do_not_overflow() {
        let r = MyReactions {
            liked_posts: vec![],
            disliked_posts: vec![],
            total_liked: u64::MAX,
            total_disliked: 1,
            total_reactions: 0,
        };
        assert!(!r.is_consistent());
    }

    #[test]
    fn test_timestamps_without_offset_read_as_utc() {
        let expected: DateTime<Utc> = "2024-05-01T10:00:00Z".parse().unwrap();
        assert_eq!(parse_timestamp("2024-05-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:00:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-05-01 10:00:00.250").map(|t| t.timestamp_millis()),
            Some(expected.timestamp_millis() + 250)
        );
        assert_eq!(parse_timestamp("yesterday"), None);

        let mut v = serde_json::to_value(post(None, 0, 0)).unwrap();
        v["created_at"] = json!("2024-05-01 10:00:00");
        v["updated_at"] = json!("2024-05-01T10:00:00");
        let p: Post = serde_json::from_value(v).unwrap();
        assert_eq!(p.created_at, expected);

        let mut v = serde_json::to_value(post(None, 0, 0)).unwrap();
        v["created_at"] = json!("not a time");
        assert!(serde_json::from_value::<Post>(v).is_err());
    }
}
