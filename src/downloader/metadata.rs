// Post metadata extraction
//
// Reddit's post JSON has no stable contract, so every field is read on its
// own: a missing or mistyped field leaves that field empty and records a
// warning, and extraction carries on with the rest.

use serde::Serialize;
use serde_json::Value;

use super::errors::DownloadError;
use super::utils::strip_query;

const REDDIT_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostInfo {
    pub title: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub flair: Option<String>,
    pub created: Option<i64>,
    pub created_utc: Option<i64>,
    pub archived: Option<bool>,
    pub quarantined: Option<bool>,
    pub over_18: Option<bool>,
    pub upvotes: Option<i64>,
    pub gilded: Option<i64>,
    pub comments: Option<i64>,
    pub crossposts: Option<i64>,
    pub duplicates: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserInfo {
    pub username: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubredditInfo {
    pub name: Option<String>,
    pub url: Option<String>,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub subscribers: Option<i64>,
    pub active_users: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageInfo {
    pub url: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Award {
    pub name: Option<String>,
    pub coin_price: Option<i64>,
    pub coin_reward: Option<i64>,
    pub count: Option<i64>,
    /// Premium days granted per award
    pub days_of_premium: Option<i64>,
}

/// Awards given to a post; missing per-award numbers count as zero
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Awards {
    pub items: Vec<Award>,
}

impl Awards {
    pub fn total_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, a| acc.saturating_add(a.count.unwrap_or(0)))
    }

    pub fn total_cost(&self) -> i64 {
        self.sum_per_award(|a| a.coin_price)
    }

    pub fn total_reward(&self) -> i64 {
        self.sum_per_award(|a| a.coin_reward)
    }

    pub fn total_days_premium(&self) -> i64 {
        self.sum_per_award(|a| a.days_of_premium)
    }

    /// Totals saturate instead of overflowing on absurd counts
    fn sum_per_award(&self, field: impl Fn(&Award) -> Option<i64>) -> i64 {
        self.items.iter().fold(0i64, |acc, a| {
            acc.saturating_add(field(a).unwrap_or(0).saturating_mul(a.count.unwrap_or(0)))
        })
    }
}

/// Everything known about a post, plus what could not be read
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostSnapshot {
    pub post: PostInfo,
    pub user: UserInfo,
    pub subreddit: SubredditInfo,
    /// Preview resolutions followed by the source image
    pub images: Vec<ImageInfo>,
    pub awards: Awards,
    /// Manifest location with its query stripped
    pub dash_url: Option<String>,
    /// Non-fatal extraction problems, one per field
    pub warnings: Vec<String>,
}

impl PostSnapshot {
    /// Pull the post out of a `.json` listing document
    pub fn from_listing(document: &Value) -> Result<Self, DownloadError> {
        let listing = document
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| DownloadError::Metadata("empty or non-listing JSON".to_string()))?;

        let post = listing[0]
            .pointer("/data/children/0/data")
            .filter(|post| post.is_object())
            .ok_or_else(|| DownloadError::Metadata("listing contains no post".to_string()))?;

        Ok(Self::extract(post))
    }

    /// Read every known field of a post object
    pub fn extract(post: &Value) -> Self {
        let mut reader = FieldReader::new(post);
        let mut snapshot = Self {
            post: PostInfo {
                title: reader.string("title"),
                url: reader.string("url"),
                thumbnail: reader.string("thumbnail"),
                flair: reader.string("link_flair_text"),
                created: reader.int("created"),
                created_utc: reader.int("created_utc"),
                archived: reader.boolean("archived"),
                quarantined: reader.boolean("quarantine"),
                over_18: reader.boolean("over_18"),
                upvotes: reader.int("ups"),
                gilded: reader.int("gilded"),
                comments: reader.int("num_comments"),
                crossposts: reader.int("num_crossposts"),
                duplicates: reader.int("num_duplicates"),
            },
            ..Self::default()
        };

        let author = reader.string("author");
        snapshot.user = UserInfo {
            url: author
                .as_ref()
                .map(|name| format!("{}/user/{}/", REDDIT_BASE, name)),
            username: author,
        };

        let name = reader.string("subreddit");
        snapshot.subreddit = SubredditInfo {
            url: name.as_ref().map(|name| format!("{}/r/{}/", REDDIT_BASE, name)),
            name,
            ..SubredditInfo::default()
        };

        snapshot.dash_url = post
            .pointer("/media/reddit_video/dash_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(|url| strip_query(url).to_string());

        snapshot.images = read_images(post, &mut reader.warnings);
        snapshot.awards = read_awards(post, &mut reader.warnings);
        snapshot.warnings = reader.warnings;

        if !snapshot.warnings.is_empty() {
            tracing::debug!(
                "Post extracted with {} warning(s)",
                snapshot.warnings.len()
            );
        }
        snapshot
    }

    /// Where the subreddit's `about` document lives, if the name is known
    pub fn subreddit_about_url(&self) -> Option<String> {
        self.subreddit
            .name
            .as_ref()
            .map(|name| format!("{}/r/{}/about/.json", REDDIT_BASE, name))
    }

    /// Merge subscriber counts and artwork from an `about` document
    pub fn apply_subreddit_about(&mut self, about: &Value) {
        let Some(data) = about.get("data").filter(|d| d.is_object()) else {
            self.warn("subreddit about document has no data");
            return;
        };

        let mut reader = FieldReader::new(data);
        self.subreddit.subscribers = reader.int("subscribers");
        self.subreddit.active_users = reader.int("accounts_active");
        self.subreddit.icon_url = reader.string("icon_img");
        self.subreddit.banner_url = reader.string("banner_background_image");
        self.warnings.append(&mut reader.warnings);
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Typed, tolerant access to one JSON object
struct FieldReader<'a> {
    object: &'a Value,
    warnings: Vec<String>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Value) -> Self {
        Self {
            object,
            warnings: Vec::new(),
        }
    }

    /// `None` for an explicit null, a warning for a missing or mistyped key
    fn field<T>(
        &mut self,
        key: &str,
        expected: &str,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        match self.object.get(key) {
            None => {
                self.warn(format!("missing field `{}`", key));
                None
            }
            Some(Value::Null) => None,
            Some(value) => {
                let converted = convert(value);
                if converted.is_none() {
                    self.warn(format!("field `{}` is not {}: {}", key, expected, value));
                }
                converted
            }
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    fn string(&mut self, key: &str) -> Option<String> {
        self.field(key, "a string", |v| v.as_str().map(str::to_string))
    }

    fn int(&mut self, key: &str) -> Option<i64> {
        self.field(key, "a number", as_int)
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        self.field(key, "a boolean", Value::as_bool)
    }
}

/// Integers may arrive as floats (`"created": 1700000000.0`)
fn as_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

fn read_image(value: &Value, warnings: &mut Vec<String>) -> ImageInfo {
    let mut reader = FieldReader::new(value);
    let image = ImageInfo {
        url: reader.string("url"),
        width: reader.int("width"),
        height: reader.int("height"),
    };
    warnings.extend(reader.warnings.into_iter().map(|w| format!("image: {}", w)));
    image
}

fn read_images(post: &Value, warnings: &mut Vec<String>) -> Vec<ImageInfo> {
    let Some(first) = post.pointer("/preview/images/0") else {
        return Vec::new();
    };

    let mut images: Vec<ImageInfo> = first
        .get("resolutions")
        .and_then(Value::as_array)
        .map(|list| list.iter().map(|v| read_image(v, warnings)).collect())
        .unwrap_or_default();

    match first.get("source") {
        Some(source) if source.is_object() => images.push(read_image(source, warnings)),
        _ => warnings.push("preview image has no source".to_string()),
    }
    images
}

fn read_awards(post: &Value, warnings: &mut Vec<String>) -> Awards {
    let items = match post.get("all_awardings") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(list)) => list
            .iter()
            .map(|award| {
                let mut reader = FieldReader::new(award);
                let parsed = Award {
                    name: reader.string("name"),
                    coin_price: reader.int("coin_price"),
                    coin_reward: reader.int("coin_reward"),
                    count: reader.int("count"),
                    days_of_premium: reader.int("days_of_premium"),
                };
                warnings.extend(reader.warnings.into_iter().map(|w| format!("award: {}", w)));
                parsed
            })
            .collect(),
        Some(other) => {
            warnings.push(format!("field `all_awardings` is not a list: {}", other));
            Vec::new()
        }
    };
    Awards { items }
}
