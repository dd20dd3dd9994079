// crates/mf_io/src/config.rs

//! "mf" 层级配置格式
//!
//! 文法：`key == value` 键值对、`key { … }` 嵌套块、`!` 起行内注释。
//! 键可重复，保持文件顺序（有序多重映射）。值按需解析。
//!
//! ```text
//! mesh {
//!   cell count == 100 1      ! nx ny
//!   origin == 0 0
//!   cell size == 1 1
//! }
//! ```

use mf_runtime::{MfError, MfResult};
use std::path::Path;
use std::str::FromStr;

/// 配置树节点
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    value: String,
    children: Vec<(String, Config)>,
}

impl Config {
    /// 空节点
    pub fn empty() -> Self {
        Self::default()
    }

    /// 带值的叶节点
    pub fn leaf(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// 从文本解析
    pub fn parse(text: &str) -> MfResult<Config> {
        let mut stack: Vec<Config> = vec![Config::empty()];
        let mut keys: Vec<String> = Vec::new();
        let mut pending_key: Option<String> = None;

        for (line_no, raw) in text.lines().enumerate() {
            // 去注释、去空白
            let line = match raw.find('!') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let err_at = |msg: &str| {
                MfError::configuration(format!("配置第 {} 行: {}", line_no + 1, msg))
            };

            if line == "}" {
                if let Some(key) = pending_key.take() {
                    // 悬空的裸键先落成空值子节点
                    if let Some(top) = stack.last_mut() {
                        top.children.push((key, Config::empty()));
                    }
                }
                let node = stack.pop().ok_or_else(|| err_at("多余的 '}'"))?;
                let key = keys.pop().ok_or_else(|| err_at("多余的 '}'"))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| err_at("多余的 '}'"))?;
                parent.children.push((key, node));
                continue;
            }

            if line == "{" {
                let key = pending_key
                    .take()
                    .ok_or_else(|| err_at("'{' 前缺少块名"))?;
                keys.push(key);
                stack.push(Config::empty());
                continue;
            }

            if let Some(stripped) = line.strip_suffix('{') {
                let key = stripped.trim();
                if key.is_empty() {
                    return Err(err_at("'{' 前缺少块名"));
                }
                if let Some(prev) = pending_key.take() {
                    if let Some(top) = stack.last_mut() {
                        top.children.push((prev, Config::empty()));
                    }
                }
                keys.push(key.to_string());
                stack.push(Config::empty());
                continue;
            }

            if let Some(prev) = pending_key.take() {
                if let Some(top) = stack.last_mut() {
                    top.children.push((prev, Config::empty()));
                }
            }

            if let Some(pos) = line.find("==") {
                let key = line[..pos].trim();
                let value = line[pos + 2..].trim();
                if key.is_empty() {
                    return Err(err_at("'==' 前缺少键名"));
                }
                let top = stack.last_mut().ok_or_else(|| err_at("内部解析状态损坏"))?;
                top.children.push((key.to_string(), Config::leaf(value)));
            } else {
                // 裸键：可能是下一行 '{' 的块名
                pending_key = Some(line.to_string());
            }
        }

        if let Some(key) = pending_key.take() {
            if let Some(top) = stack.last_mut() {
                top.children.push((key, Config::empty()));
            }
        }

        if stack.len() != 1 {
            return Err(MfError::configuration(format!(
                "配置块未闭合：缺少 {} 个 '}}'",
                stack.len() - 1
            )));
        }
        Ok(stack.remove(0))
    }

    /// 从文件加载
    pub fn load(path: &Path) -> MfResult<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MfError::io_with(format!("无法读取配置文件 {}", path.display()), e))?;
        Self::parse(&text)
    }

    /// 本节点的值
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 子节点个数（按键）
    pub fn count(&self, key: &str) -> usize {
        self.children.iter().filter(|(k, _)| k == key).count()
    }

    /// 首个同名子节点
    pub fn get_child(&self, key: &str) -> Option<&Config> {
        self.children.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// 首个同名子节点；缺失报配置错误
    pub fn child(&self, key: &str) -> MfResult<&Config> {
        self.get_child(key)
            .ok_or_else(|| MfError::configuration(format!("缺少必需的配置块 '{}'", key)))
    }

    /// 遍历全部同名子节点（文件顺序）
    pub fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Config> {
        self.children
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// 遍历全部条目（文件顺序）
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Config)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 首个同名子节点的字符串值；缺失报配置错误
    pub fn get_str(&self, key: &str) -> MfResult<&str> {
        Ok(self.child(key)?.value())
    }

    /// 解析为 T；缺失或解析失败报配置错误
    pub fn get<T: FromStr>(&self, key: &str) -> MfResult<T> {
        let raw = self.get_str(key)?;
        raw.parse::<T>().map_err(|_| {
            MfError::configuration(format!("配置键 '{}' 的值 '{}' 无法解析", key, raw))
        })
    }

    /// 解析为 T；缺失时返回默认值
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> MfResult<T> {
        match self.get_child(key) {
            None => Ok(default),
            Some(node) => node.value.parse::<T>().map_err(|_| {
                MfError::configuration(format!(
                    "配置键 '{}' 的值 '{}' 无法解析",
                    key, node.value
                ))
            }),
        }
    }

    /// 布尔值；接受 true/false、yes/no、on/off、1/0
    pub fn get_bool_or(&self, key: &str, default: bool) -> MfResult<bool> {
        match self.get_child(key) {
            None => Ok(default),
            Some(node) => match node.value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                other => Err(MfError::configuration(format!(
                    "配置键 '{}' 的值 '{}' 不是布尔量",
                    key, other
                ))),
            },
        }
    }

    /// 把空白/逗号分隔的值串解析成列表
    pub fn parse_list<T: FromStr>(raw: &str) -> MfResult<Vec<T>> {
        raw.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<T>()
                    .map_err(|_| MfError::configuration(format!("列表项 '{}' 无法解析", s)))
            })
            .collect()
    }

    /// 解析恰好 N 个元素的列表
    pub fn parse_fixed<T: FromStr + Copy, const N: usize>(raw: &str) -> MfResult<[T; N]> {
        let list = Self::parse_list::<T>(raw)?;
        if list.len() != N {
            return Err(MfError::configuration(format!(
                "'{}' 应包含 {} 个值，实得 {}",
                raw,
                N,
                list.len()
            )));
        }
        let mut out = [list[0]; N];
        out.copy_from_slice(&list);
        Ok(out)
    }

    /// 取键值并解析成 N 元定长列表
    pub fn get_fixed<T: FromStr + Copy, const N: usize>(&self, key: &str) -> MfResult<[T; N]> {
        Self::parse_fixed::<T, N>(self.get_str(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
! 示例配置
name == demo

mesh {
  cell count == 100 1
  origin == 0 0          ! 左下角
  cell size == 1 1
}

boundary {
  value == source
  name == rain
}
boundary {
  value == depth
  name == west stage
}
"#;

    #[test]
    fn test_parse_basic() {
        let c = Config::parse(SAMPLE).unwrap();
        assert_eq!(c.get_str("name").unwrap(), "demo");
        let mesh = c.child("mesh").unwrap();
        assert_eq!(mesh.get_fixed::<usize, 2>("cell count").unwrap(), [100, 1]);
        assert_eq!(mesh.get_fixed::<f64, 2>("origin").unwrap(), [0.0, 0.0]);
    }

    #[test]
    fn test_comments_stripped() {
        let c = Config::parse("a == 1 ! trailing\n! whole line\nb == 2").unwrap();
        assert_eq!(c.get::<i32>("a").unwrap(), 1);
        assert_eq!(c.get::<i32>("b").unwrap(), 2);
    }

    #[test]
    fn test_repeated_keys_in_order() {
        let c = Config::parse(SAMPLE).unwrap();
        assert_eq!(c.count("boundary"), 2);
        let names: Vec<&str> = c
            .children("boundary")
            .map(|b| b.get_str("name").unwrap())
            .collect();
        assert_eq!(names, ["rain", "west stage"]);
    }

    #[test]
    fn test_brace_on_next_line() {
        let c = Config::parse("block\n{\n  k == v\n}\n").unwrap();
        assert_eq!(c.child("block").unwrap().get_str("k").unwrap(), "v");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let c = Config::parse("a == 1").unwrap();
        assert!(matches!(
            c.get::<i32>("b").unwrap_err(),
            MfError::Configuration { .. }
        ));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(Config::parse("a {\n b == 1\n").is_err());
        assert!(Config::parse("}\n").is_err());
    }

    #[test]
    fn test_get_or_defaults() {
        let c = Config::parse("a == 1").unwrap();
        assert_eq!(c.get_or::<f64>("missing", 2.5).unwrap(), 2.5);
        assert_eq!(c.get_or::<f64>("a", 2.5).unwrap(), 1.0);
        assert!(c.get_bool_or("flag", true).unwrap());
    }

    #[test]
    fn test_bare_key_becomes_empty_child() {
        let c = Config::parse("flagkey\na == 1").unwrap();
        assert_eq!(c.count("flagkey"), 1);
        assert_eq!(c.get_child("flagkey").unwrap().value(), "");
    }

    #[test]
    fn test_values_with_spaces() {
        let c = Config::parse("method == mersenne twister 1998").unwrap();
        assert_eq!(c.get_str("method").unwrap(), "mersenne twister 1998");
    }
}
