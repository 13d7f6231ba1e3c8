//! Built-in names for common A-share codes

/// Names of frequently watched A-shares
const STOCK_NAMES: &[(&str, &str)] = &[
    ("600519", "贵州茅台"),
    ("000001", "平安银行"),
    ("300750", "宁德时代"),
    ("002594", "比亚迪"),
    ("600036", "招商银行"),
    ("601318", "中国平安"),
    ("000858", "五粮液"),
    ("600276", "恒瑞医药"),
    ("601012", "隆基绿能"),
    ("002475", "立讯精密"),
    ("300059", "东方财富"),
    ("002415", "海康威视"),
    ("600900", "长江电力"),
    ("601166", "兴业银行"),
    ("600028", "中国石化"),
];

/// Built-in name for a stock code
pub fn stock_name(code: &str) -> Option<&'static str> {
    STOCK_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}
