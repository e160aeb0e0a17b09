//! Variable storage
//!
//! Every variable is an expandable array of slots plus a sorted index of
//! string keys. A slot keeps a number, a string and a tuple side by side;
//! the sigil of the name used to access it (`$` string, `%` tuple, none
//! for numbers) selects the part that is read or written.

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::pattern::Pattern;
use super::value::{Value, ValueType};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Characters that can never appear in a variable name
pub const NAME_DELIMITERS: &str = " \t&'\"()[]=!<>+-/*:,{}";

/// One array item of a variable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub num: i64,
    pub text: String,
    pub tuple: Vec<Value>,
}

impl Slot {
    pub fn get(&self, ty: ValueType) -> Value {
        match ty {
            ValueType::Number => Value::Number(self.num),
            ValueType::String => Value::String(self.text.clone()),
            ValueType::Tuple => Value::Tuple(self.tuple.clone()),
        }
    }

    /// Store an already converted value into its own part
    pub fn put(&mut self, value: Value) {
        match value {
            Value::Number(n) => self.num = n,
            Value::String(s) => self.text = s,
            Value::Tuple(items) => self.tuple = items,
        }
    }

    /// Value a script sees when it does not ask for a specific part
    ///
    /// A non-empty tuple wins over a non-empty string, which wins over
    /// the number.
    pub fn preferred(&self) -> Value {
        if !self.tuple.is_empty() {
            Value::Tuple(self.tuple.clone())
        } else if !self.text.is_empty() {
            Value::String(self.text.clone())
        } else {
            Value::Number(self.num)
        }
    }
}

/// String key of the associative index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: String,
    pub position: usize,
}

/// Contents of one variable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variable {
    pub values: Vec<Slot>,
    /// Sorted by key; every position is below `values.len()`
    pub indices: Vec<IndexEntry>,
}

impl Variable {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Position of a string key
    pub fn key_position(&self, key: &str) -> Option<usize> {
        self.indices
            .binary_search_by(|entry| entry.key.as_str().cmp(key))
            .ok()
            .map(|i| self.indices[i].position)
    }

    /// Position of a string key, appending a fresh slot for unknown keys
    pub fn key_position_or_insert(&mut self, key: &str) -> usize {
        match self.indices.binary_search_by(|entry| entry.key.as_str().cmp(key)) {
            Ok(i) => self.indices[i].position,
            Err(i) => {
                let position = self.values.len();
                self.values.push(Slot::default());
                self.indices.insert(
                    i,
                    IndexEntry {
                        key: key.to_string(),
                        position,
                    },
                );
                position
            }
        }
    }

    pub fn get(&self, position: usize, ty: ValueType) -> Value {
        self.values
            .get(position)
            .map(|slot| slot.get(ty))
            .unwrap_or_else(|| Value::default_of(ty))
    }

    /// Write a value, growing the array with empty slots as needed
    pub fn put(&mut self, position: usize, value: Value) {
        if position >= self.values.len() {
            self.values.resize_with(position + 1, Slot::default);
        }
        self.values[position].put(value);
    }

    /// Remove one item; later items shift down and keys are rebased
    pub fn remove(&mut self, position: usize) {
        if position >= self.values.len() {
            return;
        }
        self.values.remove(position);
        self.indices.retain(|entry| entry.position != position);
        for entry in &mut self.indices {
            if entry.position > position {
                entry.position -= 1;
            }
        }
    }

    /// Copy of `count` items starting at `start`, keys included
    pub fn slice(&self, start: usize, count: usize) -> Variable {
        if start >= self.values.len() || count == 0 {
            return Variable::default();
        }
        let end = self.values.len().min(start.saturating_add(count));
        let values = self.values[start..end].to_vec();
        let indices = self
            .indices
            .iter()
            .filter(|entry| entry.position >= start && entry.position < end)
            .map(|entry| IndexEntry {
                key: entry.key.clone(),
                position: entry.position - start,
            })
            .collect();
        Variable { values, indices }
    }
}

/// Parsed variable name: storage key and selected slot type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarName {
    pub key: String,
    pub ty: ValueType,
}

impl VarName {
    /// Validate and normalize a name such as `$hero` or `count`
    pub fn parse(name: &str) -> InterpResult<Self> {
        let trimmed = name.trim_matches(|c| c == ' ' || c == '\t');
        let ty = ValueType::from_sigil(trimmed);
        let bare = match ty {
            ValueType::Number => trimmed,
            _ => &trimmed[1..],
        };
        let valid = match bare.chars().next() {
            None => false,
            Some(first) => !first.is_ascii_digit() && !bare.chars().any(|c| NAME_DELIMITERS.contains(c)),
        };
        if !valid {
            return Err(RuntimeError::incorrect_name(name));
        }
        Ok(VarName {
            key: bare.to_uppercase(),
            ty,
        })
    }
}

/// Binary operator of a compound assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// All global variables of an engine
#[derive(Debug)]
pub struct VarStore {
    vars: HashMap<String, Variable>,
    max_variables: usize,
    /// Positions at or past this are TOOMANYITEMS
    max_items: usize,
}

impl VarStore {
    pub fn new(max_variables: usize, max_items: usize) -> Self {
        VarStore {
            vars: HashMap::new(),
            max_variables,
            max_items,
        }
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    /// Number of variables currently holding anything
    pub fn count(&self) -> usize {
        self.vars.values().filter(|v| !v.is_empty()).count()
    }

    pub fn get_var(&self, key: &str) -> Option<&Variable> {
        self.vars.get(key)
    }

    /// Variable for writing, created on first use
    pub fn var_mut(&mut self, key: &str) -> InterpResult<&mut Variable> {
        if !self.vars.contains_key(key) {
            if self.vars.len() >= self.max_variables {
                self.vars.retain(|_, v| !v.is_empty());
                if self.vars.len() >= self.max_variables {
                    return Err(RuntimeError::new(ErrorKind::TooManyVars));
                }
            }
            self.vars.insert(key.to_string(), Variable::default());
        }
        self.vars
            .get_mut(key)
            .ok_or_else(|| RuntimeError::new(ErrorKind::TooManyVars))
    }

    /// Move a variable out, leaving nothing behind
    pub fn take(&mut self, key: &str) -> Variable {
        self.vars.remove(key).unwrap_or_default()
    }

    /// Put a previously taken variable back
    pub fn restore(&mut self, key: String, var: Variable) {
        if var.is_empty() {
            self.vars.remove(&key);
        } else {
            self.vars.insert(key, var);
        }
    }

    /// Position addressed by an index value, if it exists
    pub fn find_position(&self, key: &str, index: &Value) -> Option<usize> {
        match index {
            Value::Number(n) => usize::try_from(*n).ok(),
            other => self.vars.get(key)?.key_position(&other.index_key()),
        }
    }

    /// Position a write to `index` lands on, creating string keys
    pub fn position_for_write(&mut self, key: &str, index: &Value) -> InterpResult<Option<usize>> {
        match index {
            Value::Number(n) => match usize::try_from(*n) {
                Ok(position) => {
                    self.check_position(position)?;
                    Ok(Some(position))
                }
                Err(_) => Ok(None),
            },
            other => {
                let key_text = other.index_key();
                if let Some(position) = self.vars.get(key).and_then(|var| var.key_position(&key_text)) {
                    return Ok(Some(position));
                }
                self.check_position(self.size(key))?;
                Ok(Some(self.var_mut(key)?.key_position_or_insert(&key_text)))
            }
        }
    }

    fn check_position(&self, position: usize) -> InterpResult<()> {
        if position >= self.max_items {
            return Err(RuntimeError::with_detail(
                ErrorKind::TooManyItems,
                format!("index {position} is past the limit of {} items", self.max_items),
            ));
        }
        Ok(())
    }

    /// Read one item; missing items read as the empty value of the type
    pub fn get(&self, name: &VarName, index: &Value) -> Value {
        match self.find_position(&name.key, index) {
            Some(position) => self.get_at(name, position),
            None => Value::default_of(name.ty),
        }
    }

    pub fn get_at(&self, name: &VarName, position: usize) -> Value {
        self.vars
            .get(&name.key)
            .map(|var| var.get(position, name.ty))
            .unwrap_or_else(|| Value::default_of(name.ty))
    }

    /// Read the last item (`name[]`)
    pub fn get_last(&self, name: &VarName) -> Value {
        match self.size(&name.key) {
            0 => Value::default_of(name.ty),
            len => self.get_at(name, len - 1),
        }
    }

    /// Raw slot access, used for results and API reads
    pub fn slot(&self, key: &str, position: usize) -> Option<&Slot> {
        self.vars.get(key)?.values.get(position)
    }

    pub fn size(&self, key: &str) -> usize {
        self.vars.get(key).map_or(0, Variable::len)
    }

    /// Apply an assignment operator to one item
    ///
    /// `position` of `None` (a negative index) is silently ignored once
    /// the value has been validated.
    pub fn assign(
        &mut self,
        name: &VarName,
        position: Option<usize>,
        op: AssignOp,
        value: Value,
    ) -> InterpResult<()> {
        let new_value = self.combine(name, position, op, value)?;
        self.store(name, position, new_value)
    }

    /// Assign to the item addressed by `index`
    ///
    /// The new value is computed before a string key is created, so a
    /// failed assignment leaves the array as it was.
    pub fn assign_index(&mut self, name: &VarName, index: &Value, op: AssignOp, value: Value) -> InterpResult<()> {
        let current = self.find_position(&name.key, index);
        let new_value = self.combine(name, current, op, value)?;
        let position = self.position_for_write(&name.key, index)?;
        self.store(name, position, new_value)
    }

    /// Write `value` at the item addressed by `index`
    pub fn set(&mut self, name: &VarName, index: &Value, value: Value) -> InterpResult<()> {
        self.assign_index(name, index, AssignOp::Set, value)
    }

    fn combine(&self, name: &VarName, position: Option<usize>, op: AssignOp, value: Value) -> InterpResult<Value> {
        if op == AssignOp::Set {
            return convert_for(name.ty, value);
        }
        let old = position.map_or_else(|| Value::default_of(name.ty), |p| self.get_at(name, p));
        let combined = match op {
            AssignOp::Add => super::ops::add(old, value)?,
            AssignOp::Sub => super::ops::arith('-', old, value)?,
            AssignOp::Mul => super::ops::arith('*', old, value)?,
            _ => super::ops::arith('/', old, value)?,
        };
        convert_for(name.ty, combined)
    }

    fn store(&mut self, name: &VarName, position: Option<usize>, value: Value) -> InterpResult<()> {
        let Some(position) = position else {
            return Ok(());
        };
        self.check_position(position)?;
        self.var_mut(&name.key)?.put(position, value);
        Ok(())
    }

    /// Write a value into its own part regardless of the name's sigil
    pub fn put_raw(&mut self, key: &str, position: usize, value: Value) -> InterpResult<()> {
        self.check_position(position)?;
        self.var_mut(key)?.put(position, value);
        Ok(())
    }

    /// `KILLVAR name`
    pub fn remove_var(&mut self, key: &str) {
        self.vars.remove(key);
    }

    /// `KILLVAR name, index`
    pub fn remove_item(&mut self, key: &str, position: usize) {
        if let Some(var) = self.vars.get_mut(key) {
            var.remove(position);
        }
    }

    /// `COPYARR dest, src, start, count`
    pub fn copy_array(&mut self, dest: &str, src: &str, start: i64, count: Option<i64>) -> InterpResult<()> {
        if dest == src {
            return Ok(());
        }
        let start = usize::try_from(start.max(0)).unwrap_or(0);
        let source = self.vars.get(src).cloned().unwrap_or_default();
        let count = match count {
            Some(n) => usize::try_from(n.max(0)).unwrap_or(0),
            None => source.len(),
        };
        let copy = source.slice(start, count);
        *self.var_mut(dest)? = copy;
        Ok(())
    }

    /// First position at or after `start` whose item equals `value`
    pub fn position_of(&self, name: &VarName, value: &Value, start: i64) -> InterpResult<i64> {
        let Some(var) = self.vars.get(&name.key) else {
            return Ok(-1);
        };
        let wanted = convert_for(name.ty, value.clone())?;
        let start = usize::try_from(start.max(0)).unwrap_or(0);
        let found = var
            .values
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, slot)| slot.get(name.ty) == wanted);
        Ok(found.map_or(-1, |(position, _)| position as i64))
    }

    /// First position at or after `start` whose text matches all of `pattern`
    pub fn position_matching(&self, key: &str, pattern: &Pattern, start: i64) -> i64 {
        let Some(var) = self.vars.get(key) else {
            return -1;
        };
        let start = usize::try_from(start.max(0)).unwrap_or(0);
        var.values
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, slot)| pattern.matches(&slot.text))
            .map_or(-1, |(position, _)| position as i64)
    }

    /// Smallest or largest item of an array, skipping empty strings
    pub fn min_max(&self, name: &VarName, want_min: bool) -> Value {
        let Some(var) = self.vars.get(&name.key) else {
            return Value::default_of(name.ty);
        };
        let wanted = if want_min { Ordering::Less } else { Ordering::Greater };
        let mut best: Option<Value> = None;
        for slot in var.values.iter().rev() {
            let item = slot.get(name.ty);
            if matches!(&item, Value::String(s) if s.is_empty()) {
                continue;
            }
            best = match best {
                Some(current) if item.compare(&current) != wanted => Some(current),
                _ => Some(item),
            };
        }
        best.unwrap_or_else(|| Value::default_of(name.ty))
    }

    /// Sorted names of all non-empty variables
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .vars
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        names.sort();
        names
    }
}

/// Convert a value to the part selected by a name's sigil
pub fn convert_for(ty: ValueType, value: Value) -> InterpResult<Value> {
    let got = value.type_name();
    value
        .convert(ty)
        .ok_or_else(|| RuntimeError::type_mismatch(ty.name(), got))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> VarName {
        VarName::parse(text).unwrap()
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(name("$Hero"), VarName { key: "HERO".into(), ty: ValueType::String });
        assert_eq!(name(" %list "), VarName { key: "LIST".into(), ty: ValueType::Tuple });
        assert_eq!(name("gold").ty, ValueType::Number);
        for bad in ["", "$", "1abc", "a b", "x+y", "a[1]"] {
            let err = VarName::parse(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::IncorrectName, "{bad:?}");
        }
    }

    #[test]
    fn test_slots_are_independent() {
        let mut store = VarStore::new(16, 1024);
        store.set(&name("a"), &Value::Number(0), Value::Number(7)).unwrap();
        store.set(&name("$a"), &Value::Number(0), Value::from("seven")).unwrap();
        assert_eq!(store.get(&name("a"), &Value::Number(0)), Value::Number(7));
        assert_eq!(store.get(&name("$a"), &Value::Number(0)), Value::from("seven"));
        assert_eq!(store.get(&name("%a"), &Value::Number(0)), Value::Tuple(vec![]));
    }

    #[test]
    fn test_string_keys_map_to_positions() {
        let mut store = VarStore::new(16, 1024);
        let arr = name("arr");
        store.set(&arr, &Value::from("key"), Value::Number(5)).unwrap();
        store.set(&arr, &Value::from("other"), Value::Number(6)).unwrap();
        assert_eq!(store.get(&arr, &Value::from("KEY")), Value::Number(5));
        assert_eq!(store.get(&arr, &Value::Number(0)), Value::Number(5));
        assert_eq!(store.get(&arr, &Value::Number(1)), Value::Number(6));
        assert_eq!(store.get(&arr, &Value::from("missing")), Value::Number(0));
        let var = store.get_var("ARR").unwrap();
        assert!(var.indices.windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn test_failed_keyed_write_creates_no_key() {
        let mut store = VarStore::new(16, 1024);
        let n = name("n");
        let err = store.set(&n, &Value::from("k"), Value::from("text")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(store.size("N"), 0);

        store.set(&n, &Value::from("a"), Value::Number(4)).unwrap();
        let err = store
            .assign_index(&n, &Value::from("b"), AssignOp::Div, Value::Number(0))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivByZero);
        assert_eq!(store.size("N"), 1);
        let var = store.get_var("N").unwrap();
        assert_eq!(var.key_position("B"), None);

        store.assign_index(&n, &Value::from("a"), AssignOp::Add, Value::Number(1)).unwrap();
        assert_eq!(store.get(&n, &Value::from("a")), Value::Number(5));
    }

    #[test]
    fn test_item_limit() {
        let mut store = VarStore::new(16, 4);
        let a = name("a");
        store.set(&a, &Value::Number(3), Value::Number(1)).unwrap();
        let err = store.set(&a, &Value::Number(4), Value::Number(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyItems);
        let err = store.set(&a, &Value::Number(i64::MAX), Value::Number(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyItems);
        let err = store.set(&a, &Value::from("key"), Value::Number(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyItems);
        assert_eq!(store.size("A"), 4);
        let err = store.assign(&a, Some(store.size("A")), AssignOp::Set, Value::Number(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyItems);
    }

    #[test]
    fn test_compound_assignment() {
        let mut store = VarStore::new(16, 1024);
        let n = name("n");
        store.assign(&n, Some(0), AssignOp::Set, Value::Number(10)).unwrap();
        store.assign(&n, Some(0), AssignOp::Add, Value::from("5")).unwrap();
        store.assign(&n, Some(0), AssignOp::Mul, Value::Number(2)).unwrap();
        assert_eq!(store.get_at(&n, 0), Value::Number(30));
        let err = store.assign(&n, Some(0), AssignOp::Div, Value::Number(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivByZero);
        assert_eq!(store.get_at(&n, 0), Value::Number(30));
        let err = store.assign(&n, Some(0), AssignOp::Add, Value::from("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);

        let s = name("$s");
        store.assign(&s, Some(0), AssignOp::Set, Value::from("ab")).unwrap();
        store.assign(&s, Some(0), AssignOp::Add, Value::from("cd")).unwrap();
        assert_eq!(store.get_at(&s, 0), Value::from("abcd"));
    }

    #[test]
    fn test_last_item_and_growth() {
        let mut store = VarStore::new(16, 1024);
        let a = name("a");
        store.set(&a, &Value::Number(3), Value::Number(9)).unwrap();
        assert_eq!(store.size("A"), 4);
        assert_eq!(store.get_last(&a), Value::Number(9));
        assert_eq!(store.get_at(&a, 1), Value::Number(0));
        assert_eq!(store.get_last(&name("empty")), Value::Number(0));
    }

    #[test]
    fn test_remove_item_rebases_keys() {
        let mut store = VarStore::new(16, 1024);
        let a = name("a");
        store.set(&a, &Value::from("x"), Value::Number(1)).unwrap();
        store.set(&a, &Value::from("y"), Value::Number(2)).unwrap();
        store.set(&a, &Value::from("z"), Value::Number(3)).unwrap();
        store.remove_item("A", 1);
        assert_eq!(store.size("A"), 2);
        assert_eq!(store.get(&a, &Value::from("z")), Value::Number(3));
        assert_eq!(store.get(&a, &Value::from("y")), Value::Number(0));
        assert_eq!(store.get(&a, &Value::from("x")), Value::Number(1));
    }

    #[test]
    fn test_copy_array_slice() {
        let mut store = VarStore::new(16, 1024);
        let src = name("src");
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            store.set(&src, &Value::from(*key), Value::Number(i as i64 * 10)).unwrap();
        }
        store.copy_array("DST", "SRC", 1, Some(2)).unwrap();
        let dst = name("dst");
        assert_eq!(store.size("DST"), 2);
        assert_eq!(store.get(&dst, &Value::from("b")), Value::Number(10));
        assert_eq!(store.get(&dst, &Value::from("c")), Value::Number(20));
        assert_eq!(store.get(&dst, &Value::from("a")), Value::Number(0));
    }

    #[test]
    fn test_position_of_and_min_max() {
        let mut store = VarStore::new(16, 1024);
        let words = name("$w");
        for (i, word) in ["pear", "", "apple", "fig"].iter().enumerate() {
            store.set(&words, &Value::Number(i as i64), Value::from(*word)).unwrap();
        }
        assert_eq!(store.position_of(&words, &Value::from("fig"), 0).unwrap(), 3);
        assert_eq!(store.position_of(&words, &Value::from("pear"), 1).unwrap(), -1);
        assert_eq!(store.min_max(&words, true), Value::from("apple"));
        assert_eq!(store.min_max(&words, false), Value::from("pear"));

        let nums = name("n");
        for (i, n) in [4, -2, 9].iter().enumerate() {
            store.set(&nums, &Value::Number(i as i64), Value::Number(*n)).unwrap();
        }
        assert_eq!(store.min_max(&nums, true), Value::Number(-2));
        assert_eq!(store.position_of(&nums, &Value::from("9"), 0).unwrap(), 2);
        assert_eq!(store.position_of(&nums, &Value::Number(9), 0).unwrap(), 2);
        let err = store.position_of(&nums, &Value::from("nine"), 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_position_matching() {
        let mut store = VarStore::new(16, 1024);
        let fruit = name("$fruit");
        for (i, word) in ["apple", "banana", "blueberry"].iter().enumerate() {
            store.set(&fruit, &Value::Number(i as i64), Value::from(*word)).unwrap();
        }
        let b = Pattern::new("b.*").unwrap();
        assert_eq!(store.position_matching("FRUIT", &b, 0), 1);
        assert_eq!(store.position_matching("FRUIT", &b, 2), 2);
        assert_eq!(store.position_matching("FRUIT", &Pattern::new("an").unwrap(), 0), -1);
        assert_eq!(store.position_matching("NOTHING", &b, 0), -1);
    }

    #[test]
    fn test_variable_limit() {
        let mut store = VarStore::new(2, 1024);
        store.set(&name("a"), &Value::Number(0), Value::Number(1)).unwrap();
        store.set(&name("b"), &Value::Number(0), Value::Number(1)).unwrap();
        let err = store.set(&name("c"), &Value::Number(0), Value::Number(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyVars);
        store.remove_var("A");
        store.set(&name("c"), &Value::Number(0), Value::Number(1)).unwrap();
    }
}
