use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Split a field path into segments. Accepts both `a.0.b` and `a[0].b`.
pub fn parse(path: &str) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }
        let mut rest = part;
        // leading key before any bracket
        if let Some(open) = rest.find('[') {
            let key = &rest[..open];
            if !key.is_empty() {
                out.push(segment_of(key));
            }
            rest = &rest[open..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    break;
                };
                out.push(segment_of(&stripped[..close]));
                rest = &stripped[close + 1..];
            }
        } else {
            out.push(segment_of(rest));
        }
    }
    out
}

fn segment_of(s: &str) -> Segment {
    match s.parse::<usize>() {
        Ok(i) => Segment::Index(i),
        Err(_) => Segment::Key(s.to_string()),
    }
}

/// Canonical dotted form, used as the key for errors and dirty/touched sets.
pub fn normalize(path: &str) -> String {
    parse(path)
        .iter()
        .map(|s| match s {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn join(base: &str, index: usize, key: &str) -> String {
    format!("{}.{index}.{key}", normalize(base))
}

pub fn get<'a>(v: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut cur = v;
    for seg in parse(path) {
        cur = match seg {
            Segment::Key(k) => cur.get(k.as_str())?,
            Segment::Index(i) => cur.get(i)?,
        };
    }
    Some(cur)
}

pub fn get_mut<'a>(v: &'a mut JsonValue, path: &str) -> Option<&'a mut JsonValue> {
    let mut cur = v;
    for seg in parse(path) {
        cur = match seg {
            Segment::Key(k) => cur.get_mut(k.as_str())?,
            Segment::Index(i) => cur.get_mut(i)?,
        };
    }
    Some(cur)
}

/// Write `value` at `path`, creating intermediate objects for missing keys.
/// Array slots must already exist (or be exactly one past the end).
pub fn set(root: &mut JsonValue, path: &str, value: JsonValue) -> bool {
    let segs = parse(path);
    if segs.is_empty() {
        *root = value;
        return true;
    }
    let mut cur = root;
    for (i, seg) in segs.iter().enumerate() {
        let last = i + 1 == segs.len();
        match seg {
            Segment::Key(k) => {
                if cur.is_null() {
                    *cur = JsonValue::Object(serde_json::Map::new());
                }
                let Some(obj) = cur.as_object_mut() else {
                    return false;
                };
                if last {
                    obj.insert(k.clone(), value);
                    return true;
                }
                cur = obj.entry(k.clone()).or_insert(JsonValue::Null);
            }
            Segment::Index(idx) => {
                let Some(arr) = cur.as_array_mut() else {
                    return false;
                };
                if *idx == arr.len() {
                    arr.push(JsonValue::Null);
                }
                let Some(slot) = arr.get_mut(*idx) else {
                    return false;
                };
                if last {
                    *slot = value;
                    return true;
                }
                cur = slot;
            }
        }
    }
    false
}

/// True when one path is the other or lies underneath it.
pub fn overlaps(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a == b || a.starts_with(&format!("{b}.")) || b.starts_with(&format!("{a}."))
}

/// True when `path` lies strictly underneath `base`.
pub fn is_under(path: &str, base: &str) -> bool {
    normalize(path).starts_with(&format!("{}.", normalize(base)))
}
