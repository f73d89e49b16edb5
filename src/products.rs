use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::CrawlError;
use crate::parser::bingo::Bingo18Extractor;
use crate::parser::keno::KenoExtractor;
use crate::parser::max3d::{Max3dExtractor, MAX3D_TIERS};
use crate::parser::power::PowerExtractor;
use crate::parser::Extractor;

const AJAXPRO_BASE: &str = "https://vietlott.vn/ajaxpro/";

/// Sent with every request; the endpoint rejects requests without the AjaxPro method header.
pub const HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:128.0) Gecko/20100101 Firefox/128.0",
    ),
    ("Accept", "*/*"),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Content-Type", "text/plain; charset=utf-8"),
    ("X-AjaxPro-Method", "ServerSideDrawResult"),
    ("X-Requested-With", "XMLHttpRequest"),
    ("Origin", "https://vietlott.vn"),
    (
        "Referer",
        "https://vietlott.vn/vi/trung-thuong/ket-qua-trung-thuong/winning-number-645",
    ),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "same-origin"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Game {
    /// Power 6/45, 6/55, 5/35: `Key` is the per-game request token.
    /// `None` until the token is known; such products refuse to crawl.
    Power {
        key: Option<&'static str>,
        numbers: usize,
    },
    Keno,
    Bingo18,
    Max3d { game_id: Option<&'static str> },
}

/// Static description of one crawlable product.
#[derive(Debug, Clone, Copy)]
pub struct Product {
    pub name: &'static str,
    pub title: &'static str,
    pub file_name: &'static str,
    pub web_part: &'static str,
    pub threads: usize,
    pub default_index_to: u32,
    pub game: Game,
}

pub const PRODUCTS: &[Product] = &[
    Product {
        name: "power_645",
        title: "Power 6/45",
        file_name: "power645.jsonl",
        web_part: "Game645CompareWebPart",
        threads: 10,
        default_index_to: 1,
        game: Game::Power {
            key: None,
            numbers: 6,
        },
    },
    Product {
        name: "power_655",
        title: "Power 6/55",
        file_name: "power655.jsonl",
        web_part: "Game655CompareWebPart",
        threads: 10,
        default_index_to: 1,
        game: Game::Power {
            key: Some("23bbd667"),
            numbers: 7,
        },
    },
    Product {
        name: "power_535",
        title: "Power 5/35",
        file_name: "power535.jsonl",
        web_part: "Game535CompareWebPart",
        threads: 10,
        default_index_to: 1,
        game: Game::Power {
            key: None,
            numbers: 6,
        },
    },
    Product {
        name: "keno",
        title: "Keno",
        file_name: "keno.jsonl",
        web_part: "GameKenoCompareWebPart",
        threads: 20,
        default_index_to: 24,
        game: Game::Keno,
    },
    Product {
        name: "3d",
        title: "Max 3D",
        file_name: "3d.jsonl",
        web_part: "GameMax3DCompareWebPart",
        threads: 20,
        default_index_to: 1,
        game: Game::Max3d { game_id: Some("5") },
    },
    Product {
        name: "3d_pro",
        title: "Max 3D Pro",
        file_name: "3d_pro.jsonl",
        web_part: "GameMax3DProCompareWebPart",
        threads: 20,
        default_index_to: 1,
        game: Game::Max3d { game_id: None },
    },
    Product {
        name: "bingo18",
        title: "Bingo18",
        file_name: "bingo18.jsonl",
        web_part: "GameBingoCompareWebPart",
        threads: 10,
        default_index_to: 1,
        game: Game::Bingo18,
    },
];

pub const DEFAULT_PRODUCT: &str = "power_645";

pub fn lookup(name: &str) -> Result<&'static Product, CrawlError> {
    PRODUCTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| CrawlError::UnknownProduct {
            name: name.to_string(),
            available: names().join(", "),
        })
}

pub fn names() -> Vec<&'static str> {
    PRODUCTS.iter().map(|p| p.name).collect()
}

fn render_info() -> Value {
    json!({
        "SiteId": "main.frontend.vi",
        "SiteAlias": "main.vi",
        "UserSessionId": "",
        "SiteLang": "vi",
        "IsPageDesign": false,
        "ExtraParam1": "",
        "ExtraParam2": "",
        "ExtraParam3": "",
        "SiteURL": "",
        "WebPage": null,
        "SiteName": "Vietlott",
        "OrgPageAlias": null,
        "PageAlias": null,
        "RefKey": null,
        "FullPageAlias": null,
    })
}

impl Product {
    pub fn url(&self) -> String {
        format!(
            "{}Vietlott.PlugIn.WebParts.{},Vietlott.PlugIn.WebParts.ashx",
            AJAXPRO_BASE, self.web_part
        )
    }

    pub fn data_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.file_name)
    }

    /// Name of the request field whose value is still unknown, if any.
    pub fn missing_request_field(&self) -> Option<&'static str> {
        match self.game {
            Game::Power { key: None, .. } => Some("Key"),
            Game::Max3d { game_id: None } => Some("GameId"),
            _ => None,
        }
    }

    /// Default POST body; tasks override `PageIndex`.
    pub fn request_body(&self) -> Value {
        match self.game {
            Game::Power { key, .. } => json!({
                "ORenderInfo": render_info(),
                "Key": key.unwrap_or_default(),
                "GameDrawId": "",
                "ArrayNumbers": vec![vec![""; 18]; 5],
                "CheckMulti": false,
                "PageIndex": 0,
            }),
            Game::Keno => json!({
                "DrawDate": "",
                "GameDrawNo": "",
                "GameId": "6",
                "ORenderInfo": render_info(),
                "OddEven": 2,
                "PageIndex": 0,
                "ProcessType": 0,
                "TotalRow": 112453,
                "UpperLower": 2,
                "number": "",
            }),
            Game::Bingo18 => json!({
                "ORenderInfo": render_info(),
                "GameId": "8",
                "GameDrawNo": "",
                "number": "",
                "DrawDate": "",
                "PageIndex": 0,
                "TotalRow": 43569,
            }),
            Game::Max3d { game_id } => json!({
                "CheckMulti": 0,
                "GameDrawId": "",
                "GameId": game_id.unwrap_or_default(),
                "ORenderInfo": render_info(),
                "PageIndex": 0,
                "number01": "123",
                "number02": "321",
            }),
        }
    }

    pub fn extractor(&self) -> Box<dyn Extractor> {
        match self.game {
            Game::Power { numbers, .. } => Box::new(PowerExtractor::new(numbers)),
            Game::Keno => Box::new(KenoExtractor),
            Game::Bingo18 => Box::new(Bingo18Extractor),
            Game::Max3d { .. } => Box::new(Max3dExtractor { tiers: MAX3D_TIERS }),
        }
    }
}
