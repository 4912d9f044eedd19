use crate::db::connection::DbType;
use crate::error::RunnerError;

/// Parameter direction for a stored procedure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

impl std::fmt::Display for ParamMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ParamMode::In => "IN",
            ParamMode::Out => "OUT",
            ParamMode::InOut => "IN/OUT",
        })
    }
}

/// One declared parameter, parsed from the `name:type[:value]` CLI syntax.
/// OUT parameters carry no value; IN and IN/OUT parameters must.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureParam {
    pub name: String,
    pub sql_type: String,
    pub value: Option<String>,
    pub mode: ParamMode,
}

impl std::fmt::Display for ProcedureParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.mode, self.name, self.sql_type)?;
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        Ok(())
    }
}

/// Parses the three comma-separated parameter lists into one ordered list:
/// inputs first, then outputs, then in/out parameters.
pub fn parse_params(
    input: Option<&str>,
    output: Option<&str>,
    io: Option<&str>,
) -> Result<Vec<ProcedureParam>, RunnerError> {
    let mut params = Vec::new();
    if let Some(list) = input.filter(|s| !s.trim().is_empty()) {
        params.extend(parse_param_list(list, ParamMode::In)?);
    }
    if let Some(list) = output.filter(|s| !s.trim().is_empty()) {
        params.extend(parse_param_list(list, ParamMode::Out)?);
    }
    if let Some(list) = io.filter(|s| !s.trim().is_empty()) {
        params.extend(parse_param_list(list, ParamMode::InOut)?);
    }
    Ok(params)
}

fn parse_param_list(list: &str, mode: ParamMode) -> Result<Vec<ProcedureParam>, RunnerError> {
    let mut params = Vec::new();
    for (index, pair) in list.trim().split(',').enumerate() {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let parts: Vec<&str> = pair.split(':').collect();
        let position = index + 1;
        if parts.len() < 2 {
            return Err(RunnerError::parse(format!(
                "invalid parameter at position {position}: expected 'name:type[:value]', got '{pair}'"
            )));
        }
        let value = parts.get(2).map(|v| v.trim().to_string());
        match mode {
            ParamMode::In | ParamMode::InOut if value.is_none() => {
                return Err(RunnerError::parse(format!(
                    "missing value for {mode} parameter at position {position}"
                )));
            }
            ParamMode::Out if value.is_some() => {
                return Err(RunnerError::parse(format!(
                    "OUT parameter at position {position} should not have a value"
                )));
            }
            _ => {}
        }
        params.push(ProcedureParam {
            name: parts[0].trim().to_string(),
            sql_type: parts[1].trim().to_uppercase(),
            value,
            mode,
        });
    }
    Ok(params)
}

/// Driver-level call text with positional placeholders, one template per
/// vendor. Functions bind their return value as the leading placeholder.
pub fn build_call_string(
    db_type: DbType,
    name: &str,
    params: &[ProcedureParam],
    is_function: bool,
) -> String {
    let placeholders = vec!["?"; params.len()].join(", ");
    if is_function {
        return format!("{{? = call {name}({placeholders})}}");
    }
    match db_type {
        DbType::Postgres => format!("CALL {name}({placeholders})"),
        _ => format!("{{call {name}({placeholders})}}"),
    }
}

/// Oracle execution path: the call is wrapped in an anonymous block with IN
/// values inlined as literals, so it can travel through the plain statement
/// interface. OUT parameters are not representable this way.
pub fn build_anonymous_block(
    name: &str,
    params: &[ProcedureParam],
) -> Result<String, RunnerError> {
    if let Some(out_param) = params.iter().find(|p| p.mode != ParamMode::In) {
        return Err(RunnerError::parse(format!(
            "cannot inline {} parameter '{}' into an anonymous block",
            out_param.mode, out_param.name
        )));
    }
    let args: Vec<String> = params
        .iter()
        .map(|p| sql_literal(p.value.as_deref().unwrap_or_default()))
        .collect();
    Ok(format!("BEGIN {name}({}); END;", args.join(", ")))
}

/// Function execution path for drivers without out-parameter binding on the
/// plain statement interface: the return value comes back as a one-row query.
pub fn build_function_select(
    db_type: DbType,
    name: &str,
    params: &[ProcedureParam],
) -> Result<String, RunnerError> {
    if let Some(out_param) = params.iter().find(|p| p.mode != ParamMode::In) {
        return Err(RunnerError::parse(format!(
            "cannot inline {} parameter '{}' into a function call",
            out_param.mode, out_param.name
        )));
    }
    let args: Vec<String> = params
        .iter()
        .map(|p| sql_literal(p.value.as_deref().unwrap_or_default()))
        .collect();
    let call = format!("{name}({})", args.join(", "));
    Ok(match db_type {
        DbType::Oracle => format!("SELECT {call} FROM DUAL"),
        _ => format!("SELECT {call}"),
    })
}

/// Numbers pass through bare; everything else becomes a quoted string with
/// embedded quotes doubled.
fn sql_literal(value: &str) -> String {
    if value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}
