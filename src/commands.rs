//! Command execution.

use crate::Commands;
use bytes::Bytes;
use colored::Colorize;
use entangle_client::{CallOptions, Client, Reply};
use entangle_protocol::scalar::{pack_bool, pack_float64, pack_int64, pack_string, pack_uint64};
use entangle_protocol::{Decoder, Encoder, Message, Trace};
use rmpv::Value;
use serde_json::Value as Json;

type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Executes a call and returns the formatted output.
pub fn execute(client: &mut Client, cmd: Commands) -> CommandResult<String> {
    match cmd {
        Commands::Decode { .. } => unreachable!(),

        Commands::Call {
            method,
            args,
            trace,
            notify,
        } => {
            let packed = args
                .iter()
                .map(|arg| pack_argument(&parse_json_arg(arg)?))
                .collect::<CommandResult<Vec<_>>>()?;
            let arguments = Encoder::encode_arguments(&packed)?;
            tracing::debug!(
                "Calling {} with {} argument(s), {} bytes packed",
                method,
                packed.len(),
                arguments.len()
            );

            let options = CallOptions { trace, notify };
            match client.call(&method, &arguments, options)? {
                None => Ok(format!("{} notification {}", "Sent".green(), method.cyan())),
                Some(Reply::Response(response)) => {
                    let mut output = format_value(&response.result);
                    if let Some(trace) = &response.trace {
                        output.push_str(&format!("\n{} {}", "trace:".dimmed(), format_trace(trace)));
                    }
                    Ok(output)
                }
                Some(Reply::Exception(exception)) => Err(exception.to_error().into()),
            }
        }
    }
}

/// Decodes one hex-encoded frame and describes it.
pub fn decode(input: &str) -> CommandResult<String> {
    let input = input.trim();
    let input = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(input)?;
    tracing::debug!("Decoding {} byte frame", bytes.len());

    let mut decoder = Decoder::new();
    decoder.extend(&bytes);
    let message = decoder
        .decode_message()?
        .ok_or("incomplete frame")?;

    let mut output = format_message(&message);
    if decoder.buffered() > 0 {
        output.push_str(&format!(
            "\n{}: {} trailing bytes",
            "Warning".yellow(),
            decoder.buffered()
        ));
    }
    Ok(output)
}

fn format_message(message: &Message) -> String {
    let header = format!(
        "{} id={}",
        message.opcode().to_string().bold(),
        message.message_id()
    );

    match message {
        Message::Request(request) => format!(
            "{}\n  method: {}\n  arguments: {}\n  trace: {}",
            header,
            request.method.cyan(),
            format_arguments(&request.arguments),
            request.trace
        ),
        Message::Notification(notification) => format!(
            "{}\n  method: {}\n  arguments: {}",
            header,
            notification.method.cyan(),
            format_arguments(&notification.arguments)
        ),
        Message::Response(response) => {
            let mut output = format!("{}\n  result: {}", header, format_value(&response.result));
            if let Some(trace) = &response.trace {
                output.push_str(&format!("\n  trace: {}", format_trace(trace)));
            }
            output
        }
        Message::Exception(exception) => {
            let mut output = format!(
                "{}\n  error: {}",
                header,
                exception.to_error().to_string().red()
            );
            if let Some(trace) = &exception.trace {
                output.push_str(&format!("\n  trace: {}", format_trace(trace)));
            }
            output
        }
        Message::NotificationAcknowledgement { .. } => header,
    }
}

fn format_arguments(arguments: &[Value]) -> String {
    let json = Json::Array(arguments.iter().map(value_to_json).collect());
    json.to_string()
}

fn format_trace(trace: &Trace) -> String {
    value_to_json(trace.as_value()).to_string()
}

fn format_value(value: &Value) -> String {
    let json = value_to_json(value);
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}

fn parse_json_arg(arg: &str) -> CommandResult<Json> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Packs one argument. Scalars go through the checked packers; nil and
/// containers are written as generic values.
fn pack_argument(json: &Json) -> CommandResult<Bytes> {
    let value = json_to_value(json);
    let packed = match json {
        Json::Bool(_) => pack_bool(&value)?,
        Json::String(_) => pack_string(&value)?,
        Json::Number(n) if n.is_u64() => pack_uint64(&value)?,
        Json::Number(n) if n.is_i64() => pack_int64(&value)?,
        Json::Number(_) => pack_float64(&value)?,
        Json::Null | Json::Array(_) | Json::Object(_) => {
            let mut buf = Vec::new();
            rmpv::encode::write_value(&mut buf, &value)?;
            Bytes::from(buf)
        }
    };
    Ok(packed)
}

fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::from(u)
            } else if let Some(i) = n.as_i64() {
                Value::from(i)
            } else {
                Value::F64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::from(s.as_str()),
        Json::Array(items) => Value::Array(items.iter().map(json_to_value).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (Value::from(k.as_str()), json_to_value(v)))
                .collect(),
        ),
    }
}

/// Renders a decoded value as JSON. Binary becomes a hex string and
/// non-string map keys are stringified.
fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i) => {
            if let Some(u) = i.as_u64() {
                Json::from(u)
            } else if let Some(i) = i.as_i64() {
                Json::from(i)
            } else {
                Json::Null
            }
        }
        Value::F32(f) => float_to_json(f64::from(*f)),
        Value::F64(f) => float_to_json(*f),
        Value::String(s) => match s.as_str() {
            Some(s) => Json::String(s.to_string()),
            None => Json::String(hex::encode(s.as_bytes())),
        },
        Value::Binary(b) => Json::String(hex::encode(b)),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = match k.as_str() {
                        Some(s) => s.to_string(),
                        None => k.to_string(),
                    };
                    (key, value_to_json(v))
                })
                .collect(),
        ),
        Value::Ext(tag, data) => serde_json::json!({
            "ext": tag,
            "data": hex::encode(data),
        }),
    }
}

fn float_to_json(f: f64) -> Json {
    serde_json::Number::from_f64(f)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(f.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_value() {
        assert_eq!(json_to_value(&json!(null)), Value::Nil);
        assert_eq!(json_to_value(&json!(7)), Value::from(7u64));
        assert_eq!(json_to_value(&json!(-7)), Value::from(-7i64));
        assert_eq!(json_to_value(&json!(1.5)), Value::F64(1.5));
        assert_eq!(
            json_to_value(&json!(["a", true])),
            Value::Array(vec![Value::from("a"), Value::Boolean(true)])
        );
        assert_eq!(
            json_to_value(&json!({"k": 1})),
            Value::Map(vec![(Value::from("k"), Value::from(1u64))])
        );
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(&Value::Binary(vec![0xde, 0xad])), json!("dead"));
        assert_eq!(value_to_json(&Value::from(-3i64)), json!(-3));
        assert_eq!(
            value_to_json(&Value::Map(vec![(Value::from(1u64), Value::from("x"))])),
            json!({"1": "x"})
        );
        assert_eq!(value_to_json(&Value::F64(f64::NAN)), json!("NaN"));
    }

    #[test]
    fn test_pack_argument() {
        assert_eq!(pack_argument(&json!(5)).unwrap().as_ref(), &[0x05]);
        assert_eq!(pack_argument(&json!(-1)).unwrap().as_ref(), &[0xff]);
        assert_eq!(pack_argument(&json!(true)).unwrap().as_ref(), &[0xc3]);
        assert_eq!(pack_argument(&json!(null)).unwrap().as_ref(), &[0xc0]);
        assert_eq!(pack_argument(&json!("hi")).unwrap().as_ref(), &[0xa2, b'h', b'i']);
        assert_eq!(pack_argument(&json!([1, 2])).unwrap().as_ref(), &[0x92, 0x01, 0x02]);
    }

    #[test]
    fn test_parse_json_arg() {
        assert_eq!(parse_json_arg("[1, 2]").unwrap(), json!([1, 2]));
        assert!(parse_json_arg("not json").is_err());
    }

    #[test]
    fn test_decode_request() {
        let frame = Encoder::encode_request(7, "ping", &[0x90], false).unwrap();
        let output = decode(&hex::encode(&frame)).unwrap();
        assert!(output.contains("id=7"));
        assert!(output.contains("ping"));
        assert!(output.contains("arguments: []"));
    }

    #[test]
    fn test_decode_prefixed_and_trailing() {
        let output = decode("0x920409").unwrap();
        assert!(output.contains("notification_acknowledgement"));

        // [4, 9] followed by one stray nil
        let output = decode("920409c0").unwrap();
        assert!(output.contains("id=9"));
        assert!(output.contains("1 trailing bytes"));
    }

    #[test]
    fn test_decode_incomplete() {
        assert_eq!(decode("9204").unwrap_err().to_string(), "incomplete frame");
        assert!(decode("zz").is_err());
    }
}
