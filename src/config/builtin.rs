//! 內建平台配置。
//!
//! 與外部 TOML 登錄檔不同，這裡可以掛上閉包：抖音熱榜送出前
//! 重組 tags 參數，微博熱搜把相對連結補成完整網址。

use crate::config::registry::{CollectRegistry, FunctionConfig, FunctionDef, InputField, Platform};
use crate::domain::model::{
    json_number, ApiSpec, FieldSpec, FieldType, HttpMethod, Pagination, ParamsHook, Transform,
};
use serde_json::{json, Value};

/// 內建登錄表：微信視頻號、抖音、微博、嗶哩嗶哩、小紅書、知乎
pub fn default_registry() -> CollectRegistry {
    let mut registry = CollectRegistry::new();

    registry.register_function(function_def("search_user", "搜索用戶", "根據關鍵詞搜索用戶"));
    registry.register_function(function_def("user_videos", "用戶作品", "採集用戶發布的視頻"));
    registry.register_function(function_def(
        "keyword_search",
        "關鍵詞搜索",
        "根據關鍵詞搜索視頻",
    ));
    registry.register_function(function_def("hot_list", "熱榜", "採集平台熱門榜單"));

    registry.register_platform(platform(
        "wechat_video",
        "微信視頻號",
        "微信視頻號數據採集",
        &["search_user", "user_videos", "keyword_search"],
    ));
    registry.register_platform(platform("douyin", "抖音", "抖音數據採集", &["hot_list"]));
    registry.register_platform(platform("weibo", "微博", "微博數據採集", &["hot_list"]));
    registry.register_platform(platform(
        "bilibili",
        "嗶哩嗶哩",
        "嗶哩嗶哩數據採集",
        &["hot_list"],
    ));
    registry.register_platform(platform(
        "xiaohongshu",
        "小紅書",
        "小紅書數據採集",
        &["hot_list"],
    ));
    registry.register_platform(platform("zhihu", "知乎", "知乎數據採集", &["hot_list"]));

    registry.register_config("wechat_video", "search_user", wechat_search_user());
    registry.register_config("wechat_video", "user_videos", wechat_user_videos());
    registry.register_config("wechat_video", "keyword_search", wechat_keyword_search());
    registry.register_config("douyin", "hot_list", douyin_hot_list());
    registry.register_config("weibo", "hot_list", weibo_hot_list());
    registry.register_config("bilibili", "hot_list", bilibili_hot_list());
    registry.register_config("xiaohongshu", "hot_list", xiaohongshu_hot_list());
    registry.register_config("zhihu", "hot_list", zhihu_hot_list());

    registry
}

fn function_def(id: &str, name: &str, description: &str) -> FunctionDef {
    FunctionDef {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    }
}

fn platform(id: &str, name: &str, description: &str, enabled: &[&str]) -> Platform {
    Platform {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        enabled_functions: enabled.iter().map(|f| f.to_string()).collect(),
    }
}

/// 微信視頻號 - 搜索用戶。資料位於 data.data[].contact.*
fn wechat_search_user() -> FunctionConfig {
    FunctionConfig {
        input_fields: vec![InputField::new("keywords", "搜索關鍵詞").required()],
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/wechat_channels/fetch_user_search".to_string(),
            method: HttpMethod::Get,
            params: vec!["keywords".to_string()],
            data_path: Some("data.data".to_string()),
            pagination: Some(Pagination::Page {
                param_name: "page".to_string(),
                start_page: 1,
            }),
            estimate_per_page: 60,
            // 搜索結果可能很多，不開放全部採集
            allow_collect_all: false,
            string_params: Vec::new(),
            transform_params: None,
        },
        export_fields: vec![
            FieldSpec::new("username", "用戶ID", FieldType::Text).with_source("contact.username"),
            FieldSpec::new("nickname", "暱稱", FieldType::Text).with_source("contact.nickname"),
            FieldSpec::new("head_url", "頭像", FieldType::Text).with_source("contact.head_url"),
            FieldSpec::new("signature", "簡介", FieldType::Text).with_source("contact.signature"),
            FieldSpec::new("auth_profession", "認證信息", FieldType::Text)
                .with_source("contact.auth_info.auth_profession")
                .with_transform(Transform::parse("default:")),
        ],
    }
}

/// 微信視頻號 - 用戶作品。游標分頁，翻到沒有 last_buffer 為止
fn wechat_user_videos() -> FunctionConfig {
    FunctionConfig {
        input_fields: vec![InputField::new("username", "用戶 username").required()],
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/wechat_channels/fetch_home_page".to_string(),
            method: HttpMethod::Get,
            params: vec!["username".to_string()],
            data_path: Some("data.videos".to_string()),
            pagination: Some(Pagination::Cursor {
                param_name: "last_buffer".to_string(),
                response_path: "data.last_buffer".to_string(),
                has_more_path: None,
            }),
            estimate_per_page: 15,
            // 用戶作品數量有限，允許全部採集
            allow_collect_all: true,
            string_params: Vec::new(),
            transform_params: None,
        },
        export_fields: vec![
            FieldSpec::new("id", "視頻ID", FieldType::Text).with_source("id"),
            FieldSpec::new("short_title", "標題", FieldType::Text).with_source("short_title"),
            FieldSpec::new("description", "描述", FieldType::Text).with_source("description"),
            FieldSpec::new("cover_url", "封面鏈接", FieldType::Text).with_source("cover_url"),
            FieldSpec::new("video_url", "視頻鏈接", FieldType::Text).with_source("video_url"),
            FieldSpec::new("duration", "時長", FieldType::Text)
                .with_source("duration")
                .with_transform(Transform::parse("duration")),
            FieldSpec::new("like_count", "點讚數", FieldType::Number).with_source("like_count"),
            FieldSpec::new("comment_count", "評論數", FieldType::Number)
                .with_source("comment_count"),
            FieldSpec::new("forward_count", "轉發數", FieldType::Number)
                .with_source("forward_count"),
            FieldSpec::new("fav_count", "收藏數", FieldType::Number).with_source("fav_count"),
            FieldSpec::new("createtime", "發布時間", FieldType::DateTime)
                .with_source("createtime")
                .with_transform(Transform::parse("timestamp")),
            FieldSpec::new("ip_region", "IP屬地", FieldType::Text).with_source("ip_region"),
            FieldSpec::new("author_nickname", "作者暱稱", FieldType::Text)
                .with_source("author.nickname"),
            FieldSpec::new("author_avatar", "作者頭像", FieldType::Text)
                .with_source("author.avatar"),
            FieldSpec::new("author_signature", "作者簡介", FieldType::Text)
                .with_source("author.signature"),
            FieldSpec::new("author_auth_info", "作者認證", FieldType::Text)
                .with_source("author.auth_info")
                .with_transform(Transform::parse("default:")),
        ],
    }
}

/// 微信視頻號 - 關鍵詞搜索視頻。session_buffer 由翻頁自動回填
fn wechat_keyword_search() -> FunctionConfig {
    FunctionConfig {
        input_fields: vec![
            InputField::new("keywords", "搜索關鍵詞").required(),
            InputField::new("session_buffer", "會話標識（可選）").with_default(json!("")),
        ],
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/wechat_channels/fetch_default_search".to_string(),
            method: HttpMethod::Get,
            params: vec!["keywords".to_string(), "session_buffer".to_string()],
            data_path: Some("data.data".to_string()),
            pagination: Some(Pagination::Cursor {
                param_name: "session_buffer".to_string(),
                response_path: "data.last_buff".to_string(),
                has_more_path: None,
            }),
            estimate_per_page: 30,
            allow_collect_all: false,
            string_params: Vec::new(),
            transform_params: None,
        },
        export_fields: vec![
            FieldSpec::new("id", "視頻ID", FieldType::Text).with_source("id"),
            FieldSpec::new("description", "描述", FieldType::Text).with_source("description"),
            FieldSpec::new("cover_url", "封面鏈接", FieldType::Text).with_source("cover_url"),
            FieldSpec::new("thumb_url", "縮略圖鏈接", FieldType::Text).with_source("thumb_url"),
            FieldSpec::new("video_url", "視頻鏈接", FieldType::Text).with_source("video_url"),
            FieldSpec::new("decode_key", "解密密鑰", FieldType::Text).with_source("decode_key"),
            FieldSpec::new("duration", "時長", FieldType::Text)
                .with_source("duration")
                .with_transform(Transform::parse("duration")),
            FieldSpec::new("like_count", "點讚數", FieldType::Number).with_source("like_count"),
            FieldSpec::new("comment_count", "評論數", FieldType::Number)
                .with_source("comment_count"),
            FieldSpec::new("forward_count", "轉發數", FieldType::Number)
                .with_source("forward_count"),
            FieldSpec::new("fav_count", "收藏數", FieldType::Number).with_source("fav_count"),
            FieldSpec::new("createtime", "發布時間", FieldType::DateTime)
                .with_source("createtime")
                .with_transform(Transform::parse("timestamp")),
            FieldSpec::new("ip_region", "IP屬地", FieldType::Text).with_source("ip_region"),
            FieldSpec::new("author_username", "作者ID", FieldType::Text)
                .with_source("author.username"),
            FieldSpec::new("author_nickname", "作者暱稱", FieldType::Text)
                .with_source("author.nickname"),
            FieldSpec::new("author_head_url", "作者頭像", FieldType::Text)
                .with_source("author.head_url"),
            FieldSpec::new("author_signature", "作者簡介", FieldType::Text)
                .with_source("author.signature"),
            FieldSpec::new("author_auth_profession", "作者認證信息", FieldType::Text)
                .with_source("author.auth_profession")
                .with_transform(Transform::parse("default:")),
        ],
    }
}

/// 抖音 - 熱榜。POST 介面，tags 送出前包成 { value: 數字 } 陣列
fn douyin_hot_list() -> FunctionConfig {
    FunctionConfig {
        input_fields: vec![
            InputField::new("func", "熱榜類型")
                .required()
                .with_default(json!("high_play")),
            InputField::new("tags", "垂類標籤（可選）").with_default(json!([])),
            InputField::new("page", "頁碼").with_default(json!(1)),
            InputField::new("page_size", "每頁數量").with_default(json!(40)),
            InputField::new("data_window", "數據窗口（小時）").with_default(json!(24)),
        ],
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/douyin/fetch_hot_total_high_play_list"
                .to_string(),
            method: HttpMethod::Post,
            params: vec![
                "page".to_string(),
                "page_size".to_string(),
                "data_window".to_string(),
                "func".to_string(),
                "tags".to_string(),
            ],
            data_path: Some("data.data.objs".to_string()),
            pagination: Some(Pagination::Page {
                param_name: "page".to_string(),
                start_page: 1,
            }),
            estimate_per_page: 40,
            allow_collect_all: true,
            string_params: vec![
                "page".to_string(),
                "page_size".to_string(),
                "data_window".to_string(),
                "func".to_string(),
            ],
            transform_params: Some(ParamsHook::new(|params| {
                let entries = match params.get("tags") {
                    Some(Value::Array(tags)) if !tags.is_empty() => {
                        Some(tags.iter().map(tag_entry).collect::<Vec<_>>())
                    }
                    _ => None,
                };
                match entries {
                    Some(entries) => {
                        params.insert("tags".to_string(), Value::Array(entries));
                    }
                    None => {
                        params.remove("tags");
                    }
                }
            })),
        },
        export_fields: vec![
            FieldSpec::new("item_id", "作品ID", FieldType::Text).with_source("item_id"),
            FieldSpec::new("item_title", "標題", FieldType::Text).with_source("item_title"),
            FieldSpec::new("item_cover_url", "封面圖", FieldType::Text)
                .with_source("item_cover_url"),
            FieldSpec::new("item_duration", "時長", FieldType::Text)
                .with_source("item_duration")
                .with_transform(Transform::parse("duration")),
            FieldSpec::new("nick_name", "作者暱稱", FieldType::Text).with_source("nick_name"),
            FieldSpec::new("avatar_url", "作者頭像", FieldType::Text).with_source("avatar_url"),
            FieldSpec::new("fans_cnt", "粉絲數", FieldType::Number).with_source("fans_cnt"),
            FieldSpec::new("play_cnt", "播放量", FieldType::Number).with_source("play_cnt"),
            FieldSpec::new("publish_time", "發布時間", FieldType::DateTime)
                .with_source("publish_time")
                .with_transform(Transform::parse("timestamp")),
            FieldSpec::new("score", "熱度得分", FieldType::Number).with_source("score"),
            FieldSpec::new("item_url", "作品鏈接", FieldType::Text).with_source("item_url"),
            FieldSpec::new("like_cnt", "點讚數", FieldType::Number).with_source("like_cnt"),
            FieldSpec::new("follow_cnt", "漲粉數", FieldType::Number).with_source("follow_cnt"),
            FieldSpec::new("follow_rate", "漲粉率", FieldType::Number).with_source("follow_rate"),
            FieldSpec::new("like_rate", "點讚率", FieldType::Number).with_source("like_rate"),
            FieldSpec::new("media_type", "媒體類型", FieldType::Number).with_source("media_type"),
            FieldSpec::new("favorite_id", "收藏ID", FieldType::Number).with_source("favorite_id"),
            FieldSpec::new("is_favorite", "是否收藏", FieldType::Text).with_source("is_favorite"),
            FieldSpec::new("image_cnt", "圖片數量", FieldType::Number).with_source("image_cnt"),
            // 沒有 source，值由後端另外補，先佔一欄
            FieldSpec::new("selected_tags", "話題", FieldType::Text),
        ],
    }
}

/// 微博 - 熱搜榜。單次請求，不分頁
fn weibo_hot_list() -> FunctionConfig {
    FunctionConfig {
        input_fields: Vec::new(),
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/weibo/fetch_hot_search_summary".to_string(),
            method: HttpMethod::Get,
            params: Vec::new(),
            data_path: Some("data.data".to_string()),
            pagination: None,
            estimate_per_page: 50,
            allow_collect_all: false,
            string_params: Vec::new(),
            transform_params: None,
        },
        export_fields: vec![
            FieldSpec::new("rank", "排名", FieldType::Number).with_source("rank"),
            FieldSpec::new("is_top", "置頂", FieldType::Text).with_source("is_top"),
            FieldSpec::new("keyword", "關鍵詞", FieldType::Text).with_source("keyword"),
            FieldSpec::new("keyword_url", "話題鏈接", FieldType::Text)
                .with_source("keyword_url")
                .with_transform(Transform::custom(|value, _item| {
                    // 後端回相對路徑時補上站點網址
                    match value.and_then(Value::as_str) {
                        None | Some("") => Value::String(String::new()),
                        Some(link) if link.starts_with("http") => Value::String(link.to_string()),
                        Some(link) => Value::String(format!("https://s.weibo.com{}", link)),
                    }
                })),
            FieldSpec::new("tag", "標籤", FieldType::Text).with_source("tag"),
            FieldSpec::new("heat", "熱度", FieldType::Text).with_source("heat"),
        ],
    }
}

/// 嗶哩嗶哩 - 綜合熱門。POST 介面，頁碼參數叫 pn
fn bilibili_hot_list() -> FunctionConfig {
    FunctionConfig {
        input_fields: vec![InputField::new("pn", "起始頁碼").with_default(json!(1))],
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/bilibili/fetch_com_popular".to_string(),
            method: HttpMethod::Post,
            params: vec!["pn".to_string()],
            data_path: Some("data.list".to_string()),
            pagination: Some(Pagination::Page {
                param_name: "pn".to_string(),
                start_page: 1,
            }),
            estimate_per_page: 20,
            allow_collect_all: false,
            string_params: Vec::new(),
            transform_params: None,
        },
        export_fields: vec![
            FieldSpec::new("aid", "稿件ID", FieldType::Text).with_source("aid"),
            FieldSpec::new("bvid", "BVID", FieldType::Text).with_source("bvid"),
            FieldSpec::new("title", "標題", FieldType::Text).with_source("title"),
            FieldSpec::new("tname", "分區", FieldType::Text).with_source("tname"),
            FieldSpec::new("pubdate", "發布時間", FieldType::DateTime)
                .with_source("pubdate")
                .with_transform(Transform::parse("timestamp")),
            FieldSpec::new("duration", "時長", FieldType::Text)
                .with_source("duration")
                .with_transform(Transform::parse("duration")),
            FieldSpec::new("pub_location", "發布地區", FieldType::Text)
                .with_source("pub_location"),
            FieldSpec::new("view", "播放量", FieldType::Number).with_source("view"),
            FieldSpec::new("danmaku", "彈幕數", FieldType::Number).with_source("danmaku"),
            FieldSpec::new("reply", "評論數", FieldType::Number).with_source("reply"),
            FieldSpec::new("favorite", "收藏數", FieldType::Number).with_source("favorite"),
            FieldSpec::new("coin", "投幣數", FieldType::Number).with_source("coin"),
            FieldSpec::new("share", "分享數", FieldType::Number).with_source("share"),
            FieldSpec::new("like", "點讚數", FieldType::Number).with_source("like"),
            FieldSpec::new("short_link_v2", "短鏈接", FieldType::Text)
                .with_source("short_link_v2"),
            FieldSpec::new("pic", "封面圖", FieldType::Text).with_source("pic"),
            FieldSpec::new("owner_mid", "UP主ID", FieldType::Number).with_source("owner.mid"),
            FieldSpec::new("owner_name", "UP主暱稱", FieldType::Text).with_source("owner.name"),
            FieldSpec::new("owner_face", "UP主頭像", FieldType::Text).with_source("owner.face"),
        ],
    }
}

/// 小紅書 - 熱搜榜。單次請求，不分頁
fn xiaohongshu_hot_list() -> FunctionConfig {
    FunctionConfig {
        input_fields: Vec::new(),
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/xiaohongshu/fetch_hot_list".to_string(),
            method: HttpMethod::Get,
            params: Vec::new(),
            data_path: Some("data.data.items".to_string()),
            pagination: None,
            estimate_per_page: 50,
            allow_collect_all: false,
            string_params: Vec::new(),
            transform_params: None,
        },
        export_fields: vec![
            FieldSpec::new("id", "ID", FieldType::Text).with_source("id"),
            FieldSpec::new("title", "標題", FieldType::Text).with_source("title"),
            // score 是帶單位的字串，維持文字欄位
            FieldSpec::new("score", "熱度分", FieldType::Text).with_source("score"),
            FieldSpec::new("rank_change", "排名變化", FieldType::Number)
                .with_source("rank_change"),
            FieldSpec::new("type", "類型", FieldType::Text).with_source("type"),
            FieldSpec::new("word_type", "話題標記", FieldType::Text).with_source("word_type"),
            FieldSpec::new("icon", "圖標", FieldType::Text).with_source("icon"),
            FieldSpec::new("title_img", "標題圖", FieldType::Text).with_source("title_img"),
        ],
    }
}

/// 知乎 - 熱榜。limit 與 desktop 後端要求字串形式
fn zhihu_hot_list() -> FunctionConfig {
    FunctionConfig {
        input_fields: vec![
            InputField::new("limit", "返回數量").with_default(json!(50)),
            InputField::new("desktop", "桌面端樣式").with_default(json!(true)),
        ],
        api: ApiSpec {
            url: "https://i-sync.cn/api/v1/tools/zhihu/fetch_hot_list".to_string(),
            method: HttpMethod::Post,
            params: vec!["limit".to_string(), "desktop".to_string()],
            data_path: Some("data.list".to_string()),
            pagination: None,
            estimate_per_page: 50,
            allow_collect_all: false,
            string_params: vec!["limit".to_string(), "desktop".to_string()],
            transform_params: None,
        },
        export_fields: vec![
            FieldSpec::new("id", "ID", FieldType::Text).with_source("id"),
            FieldSpec::new("title", "標題", FieldType::Text).with_source("title"),
            FieldSpec::new("url", "鏈接", FieldType::Text).with_source("url"),
            FieldSpec::new("created", "創建時間", FieldType::DateTime)
                .with_source("created")
                .with_transform(Transform::parse("timestamp")),
            FieldSpec::new("answer_count", "回答數", FieldType::Number)
                .with_source("answer_count"),
            FieldSpec::new("follower_count", "關注數", FieldType::Number)
                .with_source("follower_count"),
            FieldSpec::new("excerpt", "摘要", FieldType::Text).with_source("excerpt"),
            FieldSpec::new("author_name", "作者暱稱", FieldType::Text).with_source("author.name"),
            FieldSpec::new("author_avatar", "作者頭像", FieldType::Text)
                .with_source("author.avatar_url"),
            FieldSpec::new("detail_text", "熱度描述", FieldType::Text).with_source("detail_text"),
            FieldSpec::new("thumbnail", "封面圖", FieldType::Text).with_source("thumbnail"),
        ],
    }
}

/// 垂類標籤送出前包成 { value: 數字 } 物件
fn tag_entry(id: &Value) -> Value {
    let numeric = json_number(id)
        .map(|n| {
            if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                Value::from(n as i64)
            } else {
                Value::from(n)
            }
        })
        .unwrap_or(Value::Null);
    json!({ "value": numeric })
}
