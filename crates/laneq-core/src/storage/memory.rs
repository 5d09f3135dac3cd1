use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StoreResult;
use crate::storage::traits::{ScheduleEntry, Store, WriteBatchOp};

/// In-process store with the same per-command atomicity as Redis.
///
/// A single mutex guards all data, so every primitive and every batch is
/// applied atomically. Empty sorted sets and lists are removed, matching
/// Redis key semantics.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    zsets: HashMap<String, SortedSet>,
    lists: HashMap<String, VecDeque<String>>,
    strings: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Members ordered by (score, member), the same tie-break Redis uses.
#[derive(Default)]
struct SortedSet {
    scores: HashMap<String, Score>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedSet {
    fn insert(&mut self, member: &str, score: f64) {
        let score = Score(score);
        if let Some(old) = self.scores.insert(member.to_string(), score) {
            self.ordered.remove(&(old, member.to_string()));
        }
        self.ordered.insert((score, member.to_string()));
    }

    fn pop_first(&mut self) -> Option<ScheduleEntry> {
        let (score, member) = self.ordered.pop_first()?;
        self.scores.remove(&member);
        Some(ScheduleEntry {
            member,
            score: score.0,
        })
    }

    fn first(&self) -> Option<ScheduleEntry> {
        self.ordered.first().map(|(score, member)| ScheduleEntry {
            member: member.clone(),
            score: score.0,
        })
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl Inner {
    fn zadd(&mut self, key: &str, member: &str, score: f64) {
        self.zsets
            .entry(key.to_string())
            .or_default()
            .insert(member, score);
    }

    fn rpush(&mut self, key: &str, value: &str) {
        self.lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
    }

    fn all_keys(&self) -> impl Iterator<Item = &String> {
        self.zsets
            .keys()
            .chain(self.lists.keys())
            .chain(self.strings.keys())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn zpop_min(&self, key: &str) -> StoreResult<Option<ScheduleEntry>> {
        let mut inner = self.inner.lock();
        let Some(set) = inner.zsets.get_mut(key) else {
            return Ok(None);
        };
        let popped = set.pop_first();
        if set.is_empty() {
            inner.zsets.remove(key);
        }
        Ok(popped)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        self.inner.lock().zadd(key, member, score);
        Ok(())
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let inner = self.inner.lock();
        Ok(inner.zsets.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn zpeek_min(&self, key: &str) -> StoreResult<Option<ScheduleEntry>> {
        let inner = self.inner.lock();
        Ok(inner.zsets.get(key).and_then(SortedSet::first))
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<String>> {
        let mut inner = self.inner.lock();
        let Some(list) = inner.lists.get_mut(key) else {
            return Ok(None);
        };
        let head = list.pop_front();
        if list.is_empty() {
            inner.lists.remove(key);
        }
        Ok(head)
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        let inner = self.inner.lock();
        Ok(inner.lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.inner.lock().strings.get(key).cloned())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        for key in keys {
            inner.zsets.remove(key);
            inner.lists.remove(key);
            inner.strings.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock();
        let mut matched: Vec<String> = inner
            .all_keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        matched.sort_unstable();
        Ok(matched)
    }

    async fn write_batch(&self, ops: Vec<WriteBatchOp>) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        for op in ops {
            match op {
                WriteBatchOp::ZAdd { key, member, score } => inner.zadd(&key, &member, score),
                WriteBatchOp::RPush { key, value } => inner.rpush(&key, &value),
                WriteBatchOp::Set { key, value } => {
                    inner.strings.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

enum GlobToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn glob_tokens(pattern: &str) -> Vec<GlobToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => GlobToken::AnyRun,
            '?' => GlobToken::AnyOne,
            '\\' => GlobToken::Literal(chars.next().unwrap_or('\\')),
            c => GlobToken::Literal(c),
        });
    }
    tokens
}

/// Redis-style glob supporting `*` (any run), `?` (any one char) and `\`
/// escapes. Character classes are not supported.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p = glob_tokens(pattern);
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some(GlobToken::AnyOne) => {
                pi += 1;
                ti += 1;
                continue;
            }
            Some(GlobToken::Literal(c)) if *c == t[ti] => {
                pi += 1;
                ti += 1;
                continue;
            }
            Some(GlobToken::AnyRun) => {
                star = Some((pi, ti));
                pi += 1;
                continue;
            }
            _ => {}
        }
        let Some((star_pi, star_ti)) = star else {
            return false;
        };
        pi = star_pi + 1;
        ti = star_ti + 1;
        star = Some((star_pi, star_ti + 1));
    }
    while matches!(p.get(pi), Some(GlobToken::AnyRun)) {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zpop_min_returns_lowest_score_and_removes_it() {
        let store = MemoryStore::new();
        store.zadd("z", "300", 300.0).await.unwrap();
        store.zadd("z", "100", 100.0).await.unwrap();
        store.zadd("z", "200", 200.0).await.unwrap();

        let first = store.zpop_min("z").await.unwrap().unwrap();
        assert_eq!(first.member, "100");
        assert_eq!(first.score, 100.0);
        assert_eq!(store.zcard("z").await.unwrap(), 2);

        assert_eq!(store.zpop_min("z").await.unwrap().unwrap().member, "200");
        assert_eq!(store.zpop_min("z").await.unwrap().unwrap().member, "300");
        assert!(store.zpop_min("z").await.unwrap().is_none());
        assert!(store.keys("*").await.unwrap().is_empty(), "empty set key should vanish");
    }

    #[tokio::test]
    async fn zadd_same_member_is_an_upsert() {
        let store = MemoryStore::new();
        store.zadd("z", "5", 5.0).await.unwrap();
        store.zadd("z", "5", 5.0).await.unwrap();
        assert_eq!(store.zcard("z").await.unwrap(), 1);

        store.zadd("z", "5", 1.0).await.unwrap();
        let head = store.zpeek_min("z").await.unwrap().unwrap();
        assert_eq!(head.score, 1.0);
        assert_eq!(store.zcard("z").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn equal_scores_tie_break_on_member() {
        let store = MemoryStore::new();
        store.zadd("z", "b", 1.0).await.unwrap();
        store.zadd("z", "a", 1.0).await.unwrap();
        assert_eq!(store.zpop_min("z").await.unwrap().unwrap().member, "a");
    }

    #[tokio::test]
    async fn lists_are_fifo_and_vanish_when_drained() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![
                WriteBatchOp::RPush {
                    key: "l".into(),
                    value: "1".into(),
                },
                WriteBatchOp::RPush {
                    key: "l".into(),
                    value: "2".into(),
                },
            ])
            .await
            .unwrap();

        assert_eq!(store.llen("l").await.unwrap(), 2);
        assert_eq!(store.lpop("l").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.lpop("l").await.unwrap().as_deref(), Some("2"));
        assert!(store.lpop("l").await.unwrap().is_none());
        assert_eq!(store.llen("l").await.unwrap(), 0);
        assert!(store.keys("l").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_get_del() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![WriteBatchOp::Set {
                key: "s".into(),
                value: "v".into(),
            }])
            .await
            .unwrap();
        assert_eq!(store.get("s").await.unwrap().as_deref(), Some("v"));

        store.del(&["s".to_string(), "missing".to_string()]).await.unwrap();
        assert!(store.get("s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_filters_by_glob_across_types() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![
                WriteBatchOp::ZAdd {
                    key: "app:queue:a".into(),
                    member: "1".into(),
                    score: 1.0,
                },
                WriteBatchOp::RPush {
                    key: "app:timestamp:a:1".into(),
                    value: "x".into(),
                },
                WriteBatchOp::Set {
                    key: "app:item:x".into(),
                    value: "{}".into(),
                },
                WriteBatchOp::Set {
                    key: "other:item:y".into(),
                    value: "{}".into(),
                },
            ])
            .await
            .unwrap();

        let keys = store.keys("app*").await.unwrap();
        assert_eq!(
            keys,
            vec!["app:item:x", "app:queue:a", "app:timestamp:a:1"]
        );
    }

    #[test]
    fn glob_semantics() {
        assert!(glob_match("*", ""));
        assert!(glob_match("abc*", "abc"));
        assert!(glob_match("abc*", "abcdef"));
        assert!(!glob_match("abc*", "ab"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(!glob_match("a*c*e", "abcdf"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    #[test]
    fn glob_escapes_match_literally() {
        assert!(glob_match(r"q\[1\]*", "q[1]:item:x"));
        assert!(!glob_match(r"q\[1\]*", "q1:item:x"));
        assert!(glob_match(r"a\*b*", "a*b:queue:l"));
        assert!(!glob_match(r"a\*b*", "axb:queue:l"));
        assert!(glob_match(r"x\\y*", r"x\y:item"));
    }
}
