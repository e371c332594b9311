//! Scraper output fixtures

use serde_json::{Value, json};
use social_dl::Config;
use std::path::PathBuf;

/// `taken_at` of generated Instagram posts
pub const TAKEN_AT: i64 = 1_740_800_000;

/// `created_at` of generated Weibo statuses
pub const WEIBO_CREATED_AT: &str = "Sat Mar 01 12:00:00 +0800 2025";

/// Instagram media object: a single image, or a carousel when given several URLs
pub fn instagram_post(code: &str, image_urls: &[String]) -> Value {
    let node = |url: &String| {
        json!({
            "image_versions2": {"candidates": [
                {"url": format!("{}?thumb=1", url), "width": 150, "height": 150},
                {"url": url, "width": 1080, "height": 1080}
            ]}
        })
    };

    let mut post = json!({
        "code": code,
        "taken_at": TAKEN_AT,
        "caption": {"text": format!("caption of {}", code)},
    });
    if let [single] = image_urls {
        post["image_versions2"] = node(single)["image_versions2"].clone();
    } else {
        post["carousel_media"] = Value::Array(image_urls.iter().map(node).collect());
    }
    post
}

/// Weibo status with one picture per URL
pub fn weibo_status(post_id: &str, screen_name: &str, image_urls: &[String]) -> Value {
    let pic_ids: Vec<String> = (0..image_urls.len()).map(|i| format!("p{}", i)).collect();
    let pic_infos: serde_json::Map<String, Value> = pic_ids
        .iter()
        .zip(image_urls)
        .map(|(id, url)| (id.clone(), json!({"largest": {"url": url}})))
        .collect();
    json!({
        "idstr": post_id,
        "created_at": WEIBO_CREATED_AT,
        "text_raw": "微博正文",
        "user": {"screen_name": screen_name, "idstr": "1001"},
        "pic_ids": pic_ids,
        "pic_infos": pic_infos,
    })
}

/// Store an Instagram post the way the scraper does: `<json_dir>/following/<user>/<code>.json`
pub fn write_instagram(config: &Config, user: &str, code: &str, post: &Value) -> PathBuf {
    let dir = config.input.json_dir("instagram").join("following").join(user);
    write_json(dir, code, post)
}

/// Store a Weibo status the way the scraper does: `<json_dir>/<user>/<idstr>.json`
pub fn write_weibo(config: &Config, user: &str, post_id: &str, status: &Value) -> PathBuf {
    let dir = config.input.json_dir("weibo").join(user);
    write_json(dir, post_id, status)
}

fn write_json(dir: PathBuf, stem: &str, value: &Value) -> PathBuf {
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}.json", stem));
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}
