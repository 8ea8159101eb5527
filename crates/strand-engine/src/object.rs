//! Engine methods callable from templates as `engine.<method>(...)`.

use std::sync::Arc;

use minijinja::value::{Kwargs, Object, Value, from_args};
use minijinja::{Error, ErrorKind, State};
use strand_db::{DEFAULT_VALUE_MAX_LENGTH, StructureMode};
use strand_format::{DEFAULT_SUFFIX, Formatter, Row};

use crate::context::TemplateContext;
use crate::listing::DirOptions;
use crate::Engine;

impl Object for Engine {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        let output = match method {
            "import" => {
                let (path, context): (&str, Option<Value>) = from_args(args)?;
                self.import(path, TemplateContext::from_value(context.as_ref())?)
            }
            "file" => {
                let (path,): (&str,) = from_args(args)?;
                self.file(path)
            }
            "dir" => {
                let (positional, kwargs) = split_kwargs(args)?;
                let (path, depth, exclude, indent): (
                    &str,
                    Option<usize>,
                    Option<Vec<String>>,
                    Option<usize>,
                ) = from_args(positional)?;
                let defaults = DirOptions::default();
                let options = DirOptions {
                    depth: arg_or_kwarg(depth, &kwargs, "depth")?.unwrap_or(defaults.depth),
                    exclude: arg_or_kwarg(exclude, &kwargs, "exclude")?
                        .unwrap_or(defaults.exclude),
                    indent: arg_or_kwarg(indent, &kwargs, "indent")?.unwrap_or(defaults.indent),
                };
                kwargs.assert_all_used()?;
                self.dir(path, &options)
            }
            "sanitize" => {
                let (value, max_length): (Value, Option<usize>) = from_args(args)?;
                sanitize_value(self.formatter(), &value, max_length)
            }
            "escape" => {
                let (text,): (&str,) = from_args(args)?;
                self.formatter().escape(text)
            }
            "limit" => {
                let (text, max_length, suffix): (&str, usize, Option<&str>) = from_args(args)?;
                self.formatter()
                    .limit(text, max_length, suffix.unwrap_or(DEFAULT_SUFFIX))
            }
            "table" => {
                let (rows, max_length): (Value, Option<usize>) = from_args(args)?;
                let rows = rows_from_value(&rows)?;
                self.table(&rows, max_length.unwrap_or(DEFAULT_VALUE_MAX_LENGTH))
            }
            "query" => {
                let (sql, max_length): (&str, Option<usize>) = from_args(args)?;
                self.query(sql, max_length.unwrap_or(DEFAULT_VALUE_MAX_LENGTH))
            }
            "show_create_table" => {
                let (name,): (&str,) = from_args(args)?;
                self.show_create_table(name)
            }
            "describe_columns" => {
                let (name,): (&str,) = from_args(args)?;
                self.describe_columns(name)
            }
            "list_indexes" => {
                let (name,): (&str,) = from_args(args)?;
                self.list_indexes(name)
            }
            "describe_full_table" => {
                let (positional, kwargs) = split_kwargs(args)?;
                let (name, mode, indexes, sample): (
                    &str,
                    Option<String>,
                    Option<bool>,
                    Option<usize>,
                ) = from_args(positional)?;
                let mode = if positional.len() > 1 {
                    parse_mode(mode.as_deref())?
                } else if kwargs.has("mode") {
                    parse_mode(kwargs.get::<Option<String>>("mode")?.as_deref())?
                } else {
                    Some(StructureMode::Create)
                };
                let with_indexes = arg_or_kwarg(indexes, &kwargs, "indexes")?.unwrap_or(false);
                let sample_count = arg_or_kwarg(sample, &kwargs, "sample")?.unwrap_or(0);
                kwargs.assert_all_used()?;
                self.describe_full_table(name, mode, with_indexes, sample_count)
            }
            "project_root" => {
                from_args::<()>(args)?;
                self.paths().project_root().display().to_string()
            }
            "doc_root" => {
                from_args::<()>(args)?;
                self.paths().doc_root().display().to_string()
            }
            _ => {
                return Err(Error::new(
                    ErrorKind::UnknownMethod,
                    format!("engine has no method named {method}"),
                ));
            }
        };
        Ok(Value::from(output))
    }
}

/// Sanitize a template value; `none` and undefined render as the null placeholder.
pub(crate) fn sanitize_value(
    formatter: &dyn Formatter,
    value: &Value,
    max_length: Option<usize>,
) -> String {
    if value.is_none() || value.is_undefined() {
        return formatter.sanitize(None, max_length);
    }
    match value.as_str() {
        Some(text) => formatter.sanitize(Some(text), max_length),
        None => formatter.sanitize(Some(&value.to_string()), max_length),
    }
}

/// Split trailing keyword arguments from positional ones.
fn split_kwargs(args: &[Value]) -> Result<(&[Value], Kwargs), Error> {
    let (positional, trailing) = match args.split_last() {
        Some((last, rest)) if last.is_kwargs() => (rest, std::slice::from_ref(last)),
        _ => (args, &[][..]),
    };
    let (kwargs,): (Kwargs,) = from_args(trailing)?;
    Ok((positional, kwargs))
}

/// Positional value if given, else the keyword argument `name`.
fn arg_or_kwarg<T>(positional: Option<T>, kwargs: &Kwargs, name: &str) -> Result<Option<T>, Error>
where
    T: for<'a> minijinja::value::ArgType<'a, Output = T>,
{
    match positional {
        Some(value) => Ok(Some(value)),
        None => kwargs.get::<Option<T>>(name),
    }
}

/// `none` or `"none"` skips the structure section.
fn parse_mode(mode: Option<&str>) -> Result<Option<StructureMode>, Error> {
    match mode {
        None | Some("none") => Ok(None),
        Some(mode) => mode
            .parse()
            .map(Some)
            .map_err(|e: String| Error::new(ErrorKind::InvalidOperation, e)),
    }
}

/// Convert a list of maps to rows. Column order follows each map's key order.
fn rows_from_value(value: &Value) -> Result<Vec<Row>, Error> {
    let mut rows = Vec::new();
    for item in value.try_iter()? {
        let mut row = Row::new();
        for key in item.try_iter()? {
            let cell = item.get_item(&key)?;
            let column = key.as_str().map_or_else(|| key.to_string(), str::to_owned);
            if cell.is_none() || cell.is_undefined() {
                row.push(column, None);
            } else {
                let text = cell.as_str().map_or_else(|| cell.to_string(), str::to_owned);
                row.push(column, Some(text));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
