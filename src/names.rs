//! 省级行政区名称规范化

/// 完美省级行政区名
///
/// `name` 为省级行政区全名或者简名（非简称），如 "广东"、"内蒙古"、"北京"。
pub fn perfect_province_name(name: &str) -> String {
    let name = name.trim();
    let full = match name {
        // 五大自治区
        "内蒙古" => "内蒙古自治区",
        "广西" => "广西壮族自治区",
        "西藏" => "西藏自治区",
        "宁夏" => "宁夏回族自治区",
        "新疆" => "新疆维吾尔自治区",
        // 四大直辖市
        "北京" => "北京市",
        "上海" => "上海市",
        "天津" => "天津市",
        "重庆" => "重庆市",
        // 特别行政区
        "香港" => "香港特别行政区",
        "澳门" => "澳门特别行政区",
        _ => "",
    };
    if !full.is_empty() {
        return full.to_string();
    }

    let suffixes = ["省", "市", "自治区", "特别行政区"];
    if name.is_empty() || suffixes.iter().any(|suffix| name.ends_with(suffix)) {
        name.to_string()
    } else {
        format!("{name}省")
    }
}

/// 是否为香港/澳门/台湾
pub fn is_hong_kong_macau_taiwan(name: &str) -> bool {
    matches!(
        name,
        "香港" | "澳门" | "台湾" | "香港特别行政区" | "澳门特别行政区" | "台湾省"
    )
}
