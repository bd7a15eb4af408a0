//! Native method implementations behind the method bind table.
//!
//! Each function receives already count-checked argument slots. Handles
//! returned through `ret` (strings, string names, string variants) are owned
//! by the caller.

use gdbridge_core::{
    ConversionError, ErrorCode, ExtensionApi, FromSlot, IntoSlot, ObjectPtr, Slot,
};

use crate::SoftwareEngine;
use crate::config_text;
use crate::state::{FileRecord, ObjectData, Value};

type MethodResult = Result<(), ConversionError>;

const DEFAULT_PERMISSIONS: u32 = 0o644;

fn arg<T: FromSlot>(args: &[Slot], index: usize) -> Result<T, ConversionError> {
    T::from_slot(&args[index])
}

/// Only project and user paths are addressable.
fn check_path(path: &str) -> Result<&str, ErrorCode> {
    match path
        .strip_prefix("res://")
        .or_else(|| path.strip_prefix("user://"))
    {
        Some(rest) if !rest.is_empty() => Ok(path),
        _ => Err(ErrorCode::ErrFileBadPath),
    }
}

// ============================================================================
// Object / RefCounted
// ============================================================================

pub fn object_get_class(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let class = engine.state().record(receiver).class.clone();
    *ret = engine.string_new(&class).into_slot();
    Ok(())
}

pub fn object_get_instance_id(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    *ret = engine.state().record(receiver).id.0.into_slot();
    Ok(())
}

pub fn ref_counted_get_reference_count(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let count = engine.state().record(receiver).refcount.unwrap_or(0);
    *ret = i64::from(count).into_slot();
    Ok(())
}

// ============================================================================
// Node
// ============================================================================

pub fn node_set_name(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    _ret: &mut Slot,
) -> MethodResult {
    let name = engine.text(&args[0])?;
    if let Some(node) = engine.state().record_mut(receiver).node_mut() {
        node.name = name;
    }
    Ok(())
}

pub fn node_get_name(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let name = engine
        .state()
        .record(receiver)
        .node()
        .map(|node| node.name.clone())
        .unwrap_or_default();
    *ret = engine.string_name_new(&name).into_slot();
    Ok(())
}

pub fn node_add_child(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    _ret: &mut Slot,
) -> MethodResult {
    let child: ObjectPtr = arg(args, 0)?;
    let _force_readable_name: bool = arg(args, 1)?;
    let _internal: i64 = arg(args, 2)?;
    engine.add_child(receiver, child);
    Ok(())
}

pub fn node_remove_child(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    _ret: &mut Slot,
) -> MethodResult {
    let child: ObjectPtr = arg(args, 0)?;
    engine.remove_child(receiver, child);
    Ok(())
}

pub fn node_get_child_count(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let _include_internal: bool = arg(args, 0)?;
    let count = engine
        .state()
        .record(receiver)
        .node()
        .map_or(0, |node| node.children.len());
    *ret = (count as i64).into_slot();
    Ok(())
}

/// Negative indices count from the end.
pub fn node_get_child(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let index: i64 = arg(args, 0)?;
    let _include_internal: bool = arg(args, 1)?;
    let child = {
        let state = engine.state();
        let children = state
            .record(receiver)
            .node()
            .map(|node| node.children.as_slice())
            .unwrap_or_default();
        let len = children.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        (0..len)
            .contains(&resolved)
            .then(|| children[resolved as usize])
    };
    match child {
        Some(child) => *ret = child.into_slot(),
        None => {
            engine.report(&format!("child index {index} out of bounds"), "Node::get_child");
            *ret = ObjectPtr::NULL.into_slot();
        }
    }
    Ok(())
}

pub fn node_get_parent(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let parent = engine
        .state()
        .record(receiver)
        .node()
        .and_then(|node| node.parent)
        .unwrap_or(ObjectPtr::NULL);
    *ret = parent.into_slot();
    Ok(())
}

pub fn node_is_inside_tree(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let in_tree = engine
        .state()
        .record(receiver)
        .node()
        .is_some_and(|node| node.in_tree);
    *ret = in_tree.into_slot();
    Ok(())
}

// ============================================================================
// ConfigFile
// ============================================================================

fn with_config<R>(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    f: impl FnOnce(&mut crate::state::ConfigData) -> R,
) -> Option<R> {
    let mut state = engine.state();
    match &mut state.record_mut(receiver).data {
        ObjectData::ConfigFile(data) => Some(f(data)),
        _ => None,
    }
}

/// A nil value erases the key, and the section once it is empty.
pub fn config_set_value(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    _ret: &mut Slot,
) -> MethodResult {
    let section = engine.text(&args[0])?;
    let key = engine.text(&args[1])?;
    let value = engine.value_from_variant(&args[2])?;
    with_config(engine, receiver, |data| {
        if value == Value::Nil {
            if let Some(entries) = data.get_mut(&section) {
                entries.remove(&key);
                if entries.is_empty() {
                    data.remove(&section);
                }
            }
        } else {
            data.entry(section).or_default().insert(key, value);
        }
    });
    Ok(())
}

pub fn config_get_value(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let section = engine.text(&args[0])?;
    let key = engine.text(&args[1])?;
    let stored = with_config(engine, receiver, |data| {
        data.get(&section).and_then(|entries| entries.get(&key)).cloned()
    })
    .flatten();
    let value = match stored {
        Some(value) => value,
        None => {
            let default = engine.value_from_variant(&args[2])?;
            if default == Value::Nil {
                let message = format!(
                    "couldn't find the given section \"{section}\" and key \"{key}\", \
                     and no default was given"
                );
                engine.report(&message, "ConfigFile::get_value");
            }
            default
        }
    };
    *ret = engine.variant_from_value(&value).into_slot();
    Ok(())
}

pub fn config_has_section(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let section = engine.text(&args[0])?;
    let found = with_config(engine, receiver, |data| data.contains_key(&section));
    *ret = found.unwrap_or(false).into_slot();
    Ok(())
}

pub fn config_has_section_key(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let section = engine.text(&args[0])?;
    let key = engine.text(&args[1])?;
    let found = with_config(engine, receiver, |data| {
        data.get(&section).is_some_and(|entries| entries.contains_key(&key))
    });
    *ret = found.unwrap_or(false).into_slot();
    Ok(())
}

pub fn config_save(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let path = engine.text(&args[0])?;
    let code = match check_path(&path) {
        Err(code) => code,
        Ok(path) => {
            let text = with_config(engine, receiver, |data| config_text::encode(data))
                .unwrap_or_default();
            let mut state = engine.state();
            let file = state.files.entry(path.to_owned()).or_insert(FileRecord {
                contents: String::new(),
                permissions: DEFAULT_PERMISSIONS,
            });
            if file.permissions & 0o200 == 0 {
                ErrorCode::ErrFileNoPermission
            } else {
                file.contents = text;
                ErrorCode::Ok
            }
        }
    };
    *ret = code.into_slot();
    Ok(())
}

fn replace_config(engine: &SoftwareEngine, receiver: ObjectPtr, text: &str) -> ErrorCode {
    match config_text::parse(text) {
        Ok(parsed) => {
            with_config(engine, receiver, |data| *data = parsed);
            ErrorCode::Ok
        }
        Err(line) => {
            engine.report(&format!("config parse error at line {line}"), "ConfigFile::parse");
            ErrorCode::ErrParseError
        }
    }
}

pub fn config_load(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let path = engine.text(&args[0])?;
    let code = match check_path(&path) {
        Err(code) => code,
        Ok(path) => {
            let contents = engine.state().files.get(path).map(|f| f.contents.clone());
            match contents {
                Some(text) => replace_config(engine, receiver, &text),
                None => ErrorCode::ErrFileNotFound,
            }
        }
    };
    *ret = code.into_slot();
    Ok(())
}

pub fn config_parse(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let text = engine.text(&args[0])?;
    *ret = replace_config(engine, receiver, &text).into_slot();
    Ok(())
}

pub fn config_clear(
    engine: &SoftwareEngine,
    receiver: ObjectPtr,
    _args: &[Slot],
    _ret: &mut Slot,
) -> MethodResult {
    with_config(engine, receiver, |data| data.clear());
    Ok(())
}

// ============================================================================
// FileAccess (static)
// ============================================================================

pub fn file_exists(
    engine: &SoftwareEngine,
    _receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let path = engine.text(&args[0])?;
    let exists = check_path(&path).is_ok_and(|path| engine.state().files.contains_key(path));
    *ret = exists.into_slot();
    Ok(())
}

pub fn file_get_unix_permissions(
    engine: &SoftwareEngine,
    _receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let path = engine.text(&args[0])?;
    let permissions = engine.state().files.get(&path).map(|f| f.permissions);
    if permissions.is_none() {
        engine.report(
            &format!("file \"{path}\" does not exist"),
            "FileAccess::get_unix_permissions",
        );
    }
    *ret = i64::from(permissions.unwrap_or(0)).into_slot();
    Ok(())
}

pub fn file_set_unix_permissions(
    engine: &SoftwareEngine,
    _receiver: ObjectPtr,
    args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    let path = engine.text(&args[0])?;
    let permissions: i64 = arg(args, 1)?;
    let code = match check_path(&path) {
        Err(code) => code,
        Ok(_) if !(0..=0o7777).contains(&permissions) => ErrorCode::ErrInvalidParameter,
        Ok(path) => match engine.state().files.get_mut(path) {
            Some(file) => {
                file.permissions = permissions as u32;
                ErrorCode::Ok
            }
            None => ErrorCode::ErrFileNotFound,
        },
    };
    *ret = code.into_slot();
    Ok(())
}

// ============================================================================
// Engine
// ============================================================================

pub fn engine_get_process_frames(
    engine: &SoftwareEngine,
    _receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    *ret = engine.state().process_frames.into_slot();
    Ok(())
}

pub fn engine_is_editor_hint(
    _engine: &SoftwareEngine,
    _receiver: ObjectPtr,
    _args: &[Slot],
    ret: &mut Slot,
) -> MethodResult {
    *ret = false.into_slot();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_need_a_known_prefix() {
        assert_eq!(check_path("user://save.cfg"), Ok("user://save.cfg"));
        assert_eq!(check_path("res://a/b.cfg"), Ok("res://a/b.cfg"));
        assert_eq!(check_path("/etc/passwd"), Err(ErrorCode::ErrFileBadPath));
        assert_eq!(check_path("user://"), Err(ErrorCode::ErrFileBadPath));
    }
}
