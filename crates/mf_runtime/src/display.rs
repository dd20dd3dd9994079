// crates/mf_runtime/src/display.rs

//! 终端显示表
//!
//! 固定列宽的带边框表格，用于运行循环的屏幕输出。

/// 表格列
#[derive(Debug, Clone)]
pub struct Column {
    /// 列宽（字符数）
    pub width: usize,
    /// 表头
    pub heading: String,
}

impl Column {
    /// 创建列
    pub fn new(width: usize, heading: impl Into<String>) -> Self {
        Self {
            width,
            heading: heading.into(),
        }
    }
}

/// 带边框的显示表
#[derive(Debug, Clone)]
pub struct DisplayTable {
    cols: Vec<Column>,
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn pad_left(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len >= width {
        s.chars().take(width).collect()
    } else {
        format!("{}{}", " ".repeat(width - len), s)
    }
}

impl DisplayTable {
    /// 创建表格
    pub fn new(cols: Vec<Column>) -> Self {
        Self { cols }
    }

    fn rule(&self, left: &str, mid: &str, right: &str) -> String {
        let bars: Vec<String> = self.cols.iter().map(|c| "─".repeat(c.width)).collect();
        format!("{}{}{}", left, bars.join(mid), right)
    }

    /// 顶边线
    pub fn write_top_rule(&self) {
        println!("{}", self.rule("╭", "┬", "╮"));
    }

    /// 中隔线
    pub fn write_mid_rule(&self) {
        println!("{}", self.rule("├", "┼", "┤"));
    }

    /// 底边线
    pub fn write_bot_rule(&self) {
        println!("{}", self.rule("╰", "┴", "╯"));
    }

    /// 表头行
    pub fn write_header_row(&self) {
        let cells: Vec<String> = self
            .cols
            .iter()
            .map(|c| pad_left(&c.heading, c.width))
            .collect();
        println!("│{}│", cells.join("│"));
    }

    /// 数据行；单元格数须与列数一致
    pub fn write_data_row(&self, cells: &[String]) {
        let padded: Vec<String> = self
            .cols
            .iter()
            .zip(cells)
            .map(|(c, s)| pad_left(s, c.width))
            .collect();
        println!("│{}│", padded.join("│"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_left() {
        assert_eq!(pad_left("ab", 4), "  ab");
        assert_eq!(pad_left("abcdef", 4), "abcd");
    }

    #[test]
    fn test_rule_shape() {
        let t = DisplayTable::new(vec![Column::new(3, "a"), Column::new(2, "b")]);
        assert_eq!(t.rule("╭", "┬", "╮"), "╭───┬──╮");
    }
}
