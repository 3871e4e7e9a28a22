use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::msbuild::{ParseError, ProjectItem, ProjectParser};

/// Streaming evaluator for MSBuild project XML.
///
/// Follows MSBuild's pass order: all `<PropertyGroup>` definitions are
/// evaluated first, then `<ItemGroup>` items are collected against the final
/// property table. Command-line overrides act as global properties: they seed
/// the table and the file can never replace them.
///
/// Condition support is deliberately narrow. Only expanded
/// `'lhs' == 'rhs'` / `'lhs' != 'rhs'` forms are evaluated; anything more
/// elaborate (`Exists(...)`, `And`/`Or` chains) counts as true, so an item
/// is over-reported rather than silently dropped from the audit.
pub struct MsBuildProject;

impl ProjectParser for MsBuildProject {
    fn parse(
        &self,
        path: &Path,
        properties: &BTreeMap<String, String>,
    ) -> Result<Vec<ProjectItem>, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let props = collect_properties(&content, properties)?;
        collect_items(&content, &props)
    }
}

/// Property table keyed by lowercased name (MSBuild property names are
/// case-insensitive).
type Properties = HashMap<String, String>;

/// First pass: build the property table.
fn collect_properties(
    xml: &str,
    overrides: &BTreeMap<String, String>,
) -> Result<Properties, ParseError> {
    let mut props: Properties = HashMap::new();
    let locked: HashSet<String> = overrides.keys().map(|k| k.to_lowercase()).collect();
    for (key, value) in overrides {
        props.insert(key.to_lowercase(), value.clone());
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut suppress_below: Option<usize> = None;
    let mut root_seen = false;
    // (lowercased name, accumulated text) of the property element being read
    let mut pending: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e);
                if !root_seen {
                    require_project_root(&name)?;
                    root_seen = true;
                }
                let active = suppress_below.is_none() && condition_holds(&e, &props)?;
                stack.push(name.clone());
                if !active {
                    if suppress_below.is_none() {
                        suppress_below = Some(stack.len());
                    }
                    continue;
                }
                if parent_is(&stack, "PropertyGroup") {
                    pending = Some((name.to_lowercase(), String::new()));
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                if !root_seen {
                    require_project_root(&name)?;
                    root_seen = true;
                    continue;
                }
                if suppress_below.is_some() || !condition_holds(&e, &props)? {
                    continue;
                }
                // self-closed property, e.g. <DefineConstants/>
                if stack
                    .last()
                    .is_some_and(|p| p.eq_ignore_ascii_case("PropertyGroup"))
                {
                    set_property(&mut props, &locked, &name.to_lowercase(), String::new());
                }
            }
            Event::Text(t) => {
                if suppress_below.is_none() {
                    if let Some((_, value)) = pending.as_mut() {
                        value.push_str(&t.unescape().map_err(quick_xml::Error::from)?);
                    }
                }
            }
            Event::CData(t) => {
                if suppress_below.is_none() {
                    if let Some((_, value)) = pending.as_mut() {
                        value.push_str(&String::from_utf8_lossy(&t));
                    }
                }
            }
            Event::End(_) => {
                let closing_property = parent_is(&stack, "PropertyGroup")
                    && pending
                        .as_ref()
                        .zip(stack.last())
                        .is_some_and(|((name, _), top)| top.eq_ignore_ascii_case(name));
                if closing_property {
                    if let Some((name, value)) = pending.take() {
                        if suppress_below.is_none() {
                            let expanded = expand(&value, &props);
                            set_property(&mut props, &locked, &name, expanded);
                        }
                    }
                }
                stack.pop();
                if suppress_below.is_some_and(|depth| stack.len() < depth) {
                    suppress_below = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(props)
}

/// Second pass: collect every `<ItemGroup>` child carrying an `Include`.
fn collect_items(xml: &str, props: &Properties) -> Result<Vec<ProjectItem>, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut suppress_below: Option<usize> = None;
    let mut root_seen = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e);
                if !root_seen {
                    require_project_root(&name)?;
                    root_seen = true;
                }
                let in_item_group = stack
                    .last()
                    .is_some_and(|p| p.eq_ignore_ascii_case("ItemGroup"));
                let active = suppress_below.is_none() && condition_holds(&e, props)?;
                stack.push(name.clone());
                if !active {
                    if suppress_below.is_none() {
                        suppress_below = Some(stack.len());
                    }
                    continue;
                }
                if in_item_group {
                    if let Some(include) = attribute(&e, "Include")? {
                        items.push(ProjectItem {
                            item_type: name,
                            include: expand(&include, props),
                        });
                    }
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                if !root_seen {
                    require_project_root(&name)?;
                    root_seen = true;
                    continue;
                }
                if suppress_below.is_some() || !condition_holds(&e, props)? {
                    continue;
                }
                if stack
                    .last()
                    .is_some_and(|p| p.eq_ignore_ascii_case("ItemGroup"))
                {
                    if let Some(include) = attribute(&e, "Include")? {
                        items.push(ProjectItem {
                            item_type: name,
                            include: expand(&include, props),
                        });
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
                if suppress_below.is_some_and(|depth| stack.len() < depth) {
                    suppress_below = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn require_project_root(name: &str) -> Result<(), ParseError> {
    if name.eq_ignore_ascii_case("Project") {
        Ok(())
    } else {
        Err(ParseError::NotAProject(name.to_string()))
    }
}

fn parent_is(stack: &[String], name: &str) -> bool {
    stack.len() >= 2 && stack[stack.len() - 2].eq_ignore_ascii_case(name)
}

fn set_property(props: &mut Properties, locked: &HashSet<String>, name: &str, value: String) {
    // global properties win over anything the file defines
    if locked.contains(name) {
        return;
    }
    props.insert(name.to_string(), value);
}

/// Case-insensitive attribute lookup with XML unescaping.
fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, ParseError> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref().eq_ignore_ascii_case(name.as_bytes()) {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn condition_holds(e: &BytesStart<'_>, props: &Properties) -> Result<bool, ParseError> {
    match attribute(e, "Condition")? {
        Some(cond) => Ok(eval_condition(&cond, props)),
        None => Ok(true),
    }
}

fn eval_condition(raw: &str, props: &Properties) -> bool {
    let cond = expand(raw, props);
    let cond = cond.trim();
    if cond.is_empty() {
        return true;
    }
    if let Some((lhs, rhs)) = cond.split_once("==") {
        return unquote(lhs).eq_ignore_ascii_case(&unquote(rhs));
    }
    if let Some((lhs, rhs)) = cond.split_once("!=") {
        return !unquote(lhs).eq_ignore_ascii_case(&unquote(rhs));
    }
    true
}

fn unquote(s: &str) -> String {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .unwrap_or(trimmed)
        .to_string()
}

/// Expand `$(Name)` property references; unknown names expand to "".
fn expand(input: &str, props: &Properties) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find(')') {
            Some(end) => {
                let name = &rest[start + 2..start + 2 + end];
                if let Some(value) = props.get(&name.to_lowercase()) {
                    out.push_str(value);
                }
                rest = &rest[start + 2 + end + 1..];
            }
            None => {
                // unterminated reference, keep the raw text
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_project(dir: &TempDir, name: &str, xml: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(xml.as_bytes()).unwrap();
        path
    }

    fn parse_xml(xml: &str) -> Result<Vec<ProjectItem>, ParseError> {
        let dir = TempDir::new().unwrap();
        let path = write_project(&dir, "test.csproj", xml);
        MsBuildProject.parse(&path, &BTreeMap::new())
    }

    #[test]
    fn collects_references_and_other_items() {
        let items = parse_xml(
            r#"<Project>
                 <ItemGroup>
                   <Reference Include="System.Xml" />
                   <Compile Include="Program.cs" />
                   <Reference Include="Newtonsoft.Json, Version=12.0.0.0">
                     <HintPath>packages\Newtonsoft.Json.dll</HintPath>
                   </Reference>
                 </ItemGroup>
               </Project>"#,
        )
        .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].item_type, "Reference");
        assert_eq!(items[0].include, "System.Xml");
        assert_eq!(items[1].item_type, "Compile");
        assert_eq!(items[2].include, "Newtonsoft.Json, Version=12.0.0.0");
    }

    #[test]
    fn expands_properties_in_includes() {
        let items = parse_xml(
            r#"<Project>
                 <PropertyGroup>
                   <JsonVersion>13.0.1</JsonVersion>
                 </PropertyGroup>
                 <ItemGroup>
                   <Reference Include="Newtonsoft.Json, Version=$(JsonVersion)" />
                 </ItemGroup>
               </Project>"#,
        )
        .unwrap();

        assert_eq!(items[0].include, "Newtonsoft.Json, Version=13.0.1");
    }

    #[test]
    fn property_names_are_case_insensitive() {
        let items = parse_xml(
            r#"<Project>
                 <PropertyGroup>
                   <LibName>Foo</LibName>
                 </PropertyGroup>
                 <ItemGroup>
                   <Reference Include="$(libname)" />
                 </ItemGroup>
               </Project>"#,
        )
        .unwrap();

        assert_eq!(items[0].include, "Foo");
    }

    #[test]
    fn global_overrides_beat_file_properties() {
        let dir = TempDir::new().unwrap();
        let path = write_project(
            &dir,
            "a.csproj",
            r#"<Project>
                 <PropertyGroup>
                   <Configuration>Release</Configuration>
                 </PropertyGroup>
                 <ItemGroup>
                   <Reference Include="Lib.$(Configuration)" />
                 </ItemGroup>
               </Project>"#,
        );
        let overrides = BTreeMap::from([("Configuration".to_string(), "Debug".to_string())]);
        let items = MsBuildProject.parse(&path, &overrides).unwrap();

        assert_eq!(items[0].include, "Lib.Debug");
    }

    #[test]
    fn false_condition_excludes_item_group() {
        let items = parse_xml(
            r#"<Project>
                 <ItemGroup Condition="'$(Configuration)' == 'Release'">
                   <Reference Include="ReleaseOnly" />
                 </ItemGroup>
                 <ItemGroup>
                   <Reference Include="Always" />
                 </ItemGroup>
               </Project>"#,
        )
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].include, "Always");
    }

    #[test]
    fn unrecognized_condition_keeps_item() {
        let items = parse_xml(
            r#"<Project>
                 <ItemGroup Condition="Exists('packages.config')">
                   <Reference Include="Kept" />
                 </ItemGroup>
               </Project>"#,
        )
        .unwrap();

        assert_eq!(items.len(), 1);
    }

    #[test]
    fn later_property_wins_within_file() {
        let items = parse_xml(
            r#"<Project>
                 <PropertyGroup>
                   <V>1</V>
                   <V>2</V>
                 </PropertyGroup>
                 <ItemGroup>
                   <Reference Include="Lib$(V)" />
                 </ItemGroup>
               </Project>"#,
        )
        .unwrap();

        assert_eq!(items[0].include, "Lib2");
    }

    #[test]
    fn unknown_property_expands_empty() {
        assert_eq!(expand("A$(Nope)B", &HashMap::new()), "AB");
        assert_eq!(expand("$(unterminated", &HashMap::new()), "$(unterminated");
    }

    #[test]
    fn condition_forms() {
        let props = HashMap::from([("cfg".to_string(), "Debug".to_string())]);
        assert!(eval_condition("'$(Cfg)' == 'debug'", &props));
        assert!(!eval_condition("'$(Cfg)' == 'Release'", &props));
        assert!(eval_condition("'$(Cfg)' != 'Release'", &props));
        assert!(eval_condition("", &props));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse_xml("<Project><ItemGroup></Project>").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn non_project_root_is_rejected() {
        let err = parse_xml("<html><body/></html>").unwrap_err();
        assert!(matches!(err, ParseError::NotAProject(name) if name == "html"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MsBuildProject
            .parse(Path::new("/nonexistent/x.csproj"), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
