use serde::{Deserialize, Serialize};

use super::state::{Life, PlayerNumber};

pub const DEFAULT_HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub player: PlayerNumber,
    pub from: Life,
    pub to: Life,
}

impl LogEntry {
    pub fn delta(&self) -> Life {
        self.to - self.from
    }
}

/// 历史窗口中的一行，`index` 为日志中的绝对位置。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowEntry {
    pub index: usize,
    pub entry: LogEntry,
    /// 变化量，用于显示 `(+N)` / `(-N)`。
    pub delta: Life,
    pub is_current: bool,
}

/// 生命值变动日志：追加写入，带撤销/重做游标。
///
/// `applied` 个条目已生效，游标指向其中最后一个；其后的条目可重做，
/// 直到下一次写入时被丢弃。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryLog {
    entries: Vec<LogEntry>,
    applied: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// 记录一次变化并丢弃重做分支；`from == to` 时不记录。
    pub fn record(&mut self, player: PlayerNumber, from: Life, to: Life) -> bool {
        if from == to {
            return false;
        }
        self.entries.truncate(self.applied);
        self.entries.push(LogEntry { player, from, to });
        self.applied = self.entries.len();
        true
    }

    pub fn undo(&mut self) -> Option<LogEntry> {
        let cursor = self.cursor()?;
        let entry = self.entries.get(cursor).copied()?;
        self.applied = cursor;
        Some(entry)
    }

    pub fn redo(&mut self) -> Option<LogEntry> {
        let entry = self.entries.get(self.applied).copied()?;
        self.applied += 1;
        Some(entry)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }

    /// 以游标为中心截取最多 `size` 条，最新在前。
    pub fn visible_window(&self, size: usize) -> Vec<WindowEntry> {
        if size == 0 {
            return Vec::new();
        }
        let len = self.entries.len();
        let lead = size / 2;
        let trail = size - lead - 1;
        let cursor = self.cursor();
        let range = match cursor {
            None => 0..len.min(size),
            Some(head) if head <= lead => 0..len.min(size),
            Some(head) if len - head - 1 <= trail => len.saturating_sub(size)..len,
            Some(head) => head - lead..head + trail + 1,
        };

        range
            .rev()
            .map(|index| WindowEntry {
                index,
                entry: self.entries[index],
                delta: self.entries[index].delta(),
                is_current: Some(index) == cursor,
            })
            .collect()
    }
}
