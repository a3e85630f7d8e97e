use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::Path;

use crate::filter::matcher::ValueTarget;
use crate::filter::policy_rule::ContextFact;
use crate::model::attribute_policy::{
    AttributeRuleConfig, MatcherConfig, PolicyConfig, PolicyGroupConfig, RequirementConfig, RuleRef,
    StringTest,
};

const DEFAULT_GROUP_ID: &str = "ShibbolethAttributeFilterPolicyGroup";

pub fn parse(path: &Path) -> Result<PolicyGroupConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_str(&content).with_context(|| format!("Failed to load policy from {}", path.display()))
}

pub fn parse_str(xml: &str) -> Result<PolicyGroupConfig> {
    let root = read_tree(xml)?;
    if root.name != "AttributeFilterPolicyGroup" {
        bail!(
            "expected <AttributeFilterPolicyGroup> as root element, found <{}>",
            root.name
        );
    }

    let mut group = PolicyGroupConfig {
        id: root.attr("id").unwrap_or(DEFAULT_GROUP_ID).to_string(),
        ..PolicyGroupConfig::default()
    };

    for child in &root.children {
        match child.name.as_str() {
            "AttributeFilterPolicy" => {
                let policy = parse_policy(child)?;
                if group.policies.iter().any(|p| p.id == policy.id) {
                    bail!("duplicate AttributeFilterPolicy id '{}'", policy.id);
                }
                group.policies.push(policy);
            }
            "PolicyRequirementRule" => {
                let id = child.required("id")?.to_string();
                let rule = parse_requirement(child)
                    .with_context(|| format!("in PolicyRequirementRule '{}'", id))?;
                if group.shared_requirement_rules.insert(id.clone(), rule).is_some() {
                    bail!("duplicate PolicyRequirementRule id '{}'", id);
                }
            }
            "PermitValueRule" | "DenyValueRule" => {
                let id = child.required("id")?.to_string();
                let matcher = parse_matcher(child)
                    .with_context(|| format!("in {} '{}'", child.name, id))?;
                if group.shared_matchers.insert(id.clone(), matcher).is_some() {
                    bail!("duplicate value rule id '{}'", id);
                }
            }
            "AttributeRule" => {
                let id = child.required("id")?.to_string();
                let rule = parse_attribute_rule(child)
                    .with_context(|| format!("in AttributeRule '{}'", id))?;
                if group.shared_attribute_rules.insert(id.clone(), rule).is_some() {
                    bail!("duplicate AttributeRule id '{}'", id);
                }
            }
            other => bail!("unexpected element <{}> in policy group", other),
        }
    }

    Ok(group)
}

fn parse_policy(el: &Element) -> Result<PolicyConfig> {
    let id = el.required("id")?.to_string();
    let context = || format!("in AttributeFilterPolicy '{}'", id);

    let mut requirement = None;
    let mut attribute_rules = Vec::new();
    for child in &el.children {
        match child.name.as_str() {
            "PolicyRequirementRule" | "PolicyRequirementRuleReference" => {
                if requirement.is_some() {
                    return Err(anyhow!("more than one policy requirement rule")).with_context(context);
                }
                requirement = Some(if child.name == "PolicyRequirementRule" {
                    RuleRef::Inline(parse_requirement(child).with_context(context)?)
                } else {
                    RuleRef::Reference(child.reference().with_context(context)?)
                });
            }
            "AttributeRule" => {
                attribute_rules.push(RuleRef::Inline(parse_attribute_rule(child).with_context(context)?));
            }
            "AttributeRuleReference" => {
                attribute_rules.push(RuleRef::Reference(child.reference().with_context(context)?));
            }
            other => {
                return Err(anyhow!("unexpected element <{}>", other)).with_context(context);
            }
        }
    }

    let requirement = requirement
        .ok_or_else(|| anyhow!("no PolicyRequirementRule"))
        .with_context(context)?;
    Ok(PolicyConfig {
        id,
        requirement,
        attribute_rules,
    })
}

fn parse_attribute_rule(el: &Element) -> Result<AttributeRuleConfig> {
    let mut rule = AttributeRuleConfig {
        id: el.attr("id").map(str::to_string),
        attribute_id: el.required("attributeID")?.to_string(),
        permit: None,
        deny: None,
    };

    for child in &el.children {
        let (slot, value) = match child.name.as_str() {
            "PermitValueRule" => (&mut rule.permit, RuleRef::Inline(parse_matcher(child)?)),
            "PermitValueRuleReference" => (&mut rule.permit, RuleRef::Reference(child.reference()?)),
            "DenyValueRule" => (&mut rule.deny, RuleRef::Inline(parse_matcher(child)?)),
            "DenyValueRuleReference" => (&mut rule.deny, RuleRef::Reference(child.reference()?)),
            other => bail!("unexpected element <{}> in AttributeRule for '{}'", other, rule.attribute_id),
        };
        if slot.is_some() {
            bail!("AttributeRule for '{}' has more than one {}", rule.attribute_id, child.name);
        }
        *slot = Some(value);
    }

    match (&rule.permit, &rule.deny) {
        (Some(_), Some(_)) => bail!(
            "AttributeRule for '{}' has both a permit and a deny value rule",
            rule.attribute_id
        ),
        (None, None) => bail!(
            "AttributeRule for '{}' has neither a permit nor a deny value rule",
            rule.attribute_id
        ),
        _ => Ok(rule),
    }
}

fn parse_requirement(el: &Element) -> Result<RequirementConfig> {
    let ty = el.xsi_type()?;
    let rule = match ty {
        "ANY" => RequirementConfig::Any,
        "AND" => RequirementConfig::And(parse_children(el, parse_requirement)?),
        "OR" => RequirementConfig::Or(parse_children(el, parse_requirement)?),
        "NOT" => RequirementConfig::Not(Box::new(parse_single_child(el, parse_requirement)?)),
        "AttributeRequesterString" | "Requester" => fact(ContextFact::AttributeRequester, string_test(el)?),
        "AttributeRequesterRegex" | "RequesterRegex" => fact(ContextFact::AttributeRequester, regex_test(el, "regex")?),
        "AttributeIssuerString" | "Issuer" => fact(ContextFact::AttributeIssuer, string_test(el)?),
        "AttributeIssuerRegex" | "IssuerRegex" => fact(ContextFact::AttributeIssuer, regex_test(el, "regex")?),
        "PrincipalNameString" | "PrincipalName" => fact(ContextFact::PrincipalName, string_test(el)?),
        "PrincipalNameRegex" => fact(ContextFact::PrincipalName, regex_test(el, "regex")?),
        "AuthenticationMethodString" | "AuthenticationMethod" => {
            fact(ContextFact::AuthenticationMethod, string_test(el)?)
        }
        "AuthenticationMethodRegex" => fact(ContextFact::AuthenticationMethod, regex_test(el, "regex")?),
        "NumberOfAttributeValues" | "NumOfAttributeValues" => RequirementConfig::NumOfAttributeValues {
            attribute_id: el.required("attributeID")?.to_string(),
            minimum: el.number("minimum", 0)?,
            maximum: el.number("maximum", usize::MAX)?,
        },
        "AttributeRequesterEntityAttributeExactMatch" | "EntityAttributeExactMatch" => {
            RequirementConfig::EntityAttribute {
                name: el.required("attributeName")?.to_string(),
                name_format: el.attr("attributeNameFormat").map(str::to_string),
                test: StringTest::Exact {
                    value: el.required("attributeValue")?.to_string(),
                    case_sensitive: true,
                },
            }
        }
        "AttributeRequesterEntityAttributeRegexMatch" | "EntityAttributeRegexMatch" => {
            RequirementConfig::EntityAttribute {
                name: el.required("attributeName")?.to_string(),
                name_format: el.attr("attributeNameFormat").map(str::to_string),
                test: regex_test(el, "attributeValueRegex")?,
            }
        }
        "AttributeRequesterInEntityGroup" | "InEntityGroup" => RequirementConfig::InEntityGroup {
            group: el.required("groupID")?.to_string(),
        },
        "AttributeRequesterNameIDFormatExactMatch" | "NameIDFormatExactMatch" => {
            RequirementConfig::NameIdFormat {
                format: el.required("nameIdFormat")?.to_string(),
            }
        }
        "RegistrationAuthority" => RequirementConfig::RegistrationAuthority {
            issuers: el
                .required("registrars")?
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            match_if_metadata_silent: el.flag("matchIfMetadataSilent", false)?,
        },
        value_type if is_value_type(value_type) => RequirementConfig::Matcher {
            matcher: Box::new(parse_matcher(el)?),
            attribute_id: el.attr("attributeID").map(str::to_string),
        },
        other => bail!("unsupported rule type '{}'", other),
    };
    Ok(rule)
}

fn parse_matcher(el: &Element) -> Result<MatcherConfig> {
    let ty = el.xsi_type()?;
    let matcher = match ty {
        "ANY" => MatcherConfig::Any,
        "AND" => MatcherConfig::And(parse_children(el, parse_matcher)?),
        "OR" => MatcherConfig::Or(parse_children(el, parse_matcher)?),
        "NOT" => MatcherConfig::Not(Box::new(parse_single_child(el, parse_matcher)?)),
        "AttributeValueString" | "Value" => value(el, ValueTarget::Value, string_test(el)?),
        "AttributeValueRegex" | "ValueRegex" => value(el, ValueTarget::Value, regex_test(el, "regex")?),
        "AttributeScopeString" | "Scope" => value(el, ValueTarget::Scope, string_test(el)?),
        "AttributeScopeRegex" | "ScopeRegex" => value(el, ValueTarget::Scope, regex_test(el, "regex")?),
        "AttributeInMetadata" => MatcherConfig::InMetadata {
            only_if_required: el.flag("onlyIfRequired", true)?,
            match_if_metadata_silent: el.flag("matchIfMetadataSilent", false)?,
            attribute_name: el.attr("attributeName").map(str::to_string),
            attribute_name_format: el.attr("attributeNameFormat").map(str::to_string),
        },
        other => MatcherConfig::Requirement(Box::new(
            parse_requirement(el).with_context(|| format!("in value rule of type '{}'", other))?,
        )),
    };
    Ok(matcher)
}

fn is_value_type(ty: &str) -> bool {
    matches!(
        ty,
        "AttributeValueString"
            | "Value"
            | "AttributeValueRegex"
            | "ValueRegex"
            | "AttributeScopeString"
            | "Scope"
            | "AttributeScopeRegex"
            | "ScopeRegex"
            | "AttributeInMetadata"
    )
}

fn fact(fact: ContextFact, test: StringTest) -> RequirementConfig {
    RequirementConfig::Fact { fact, test }
}

fn value(el: &Element, target: ValueTarget, test: StringTest) -> MatcherConfig {
    MatcherConfig::Value {
        target,
        test,
        attribute_id: el.attr("attributeID").map(str::to_string),
    }
}

/// `value` plus `caseSensitive`, falling back to the legacy `ignoreCase`.
fn string_test(el: &Element) -> Result<StringTest> {
    let case_sensitive = match el.attr("caseSensitive") {
        Some(_) => el.flag("caseSensitive", true)?,
        None => !el.flag("ignoreCase", false)?,
    };
    Ok(StringTest::Exact {
        value: el.required("value")?.to_string(),
        case_sensitive,
    })
}

fn regex_test(el: &Element, attribute: &str) -> Result<StringTest> {
    Ok(StringTest::Regex(el.required(attribute)?.to_string()))
}

fn parse_children<T>(el: &Element, parse: fn(&Element) -> Result<T>) -> Result<Vec<RuleRef<T>>> {
    el.children
        .iter()
        .map(|child| match child.name.as_str() {
            "Rule" => parse(child).map(RuleRef::Inline),
            "RuleReference" => child.reference().map(RuleRef::Reference),
            other => bail!("unexpected element <{}> inside {}", other, el.name),
        })
        .collect()
}

fn parse_single_child<T>(el: &Element, parse: fn(&Element) -> Result<T>) -> Result<RuleRef<T>> {
    let mut children = parse_children(el, parse)?;
    if children.len() != 1 {
        bail!("NOT in <{}> needs exactly one child rule, found {}", el.name, children.len());
    }
    Ok(children.remove(0))
}

/// Namespace-free view of an XML element.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let attributes = e
            .attributes()
            .filter_map(|a| a.ok())
            .map(|a| {
                let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
                let value = a
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).to_string());
                (strip_prefix(&key).to_string(), value)
            })
            .collect();
        Self {
            name: local_name(e),
            attributes,
            ..Self::default()
        }
    }

    /// Trimmed attribute value; blank counts as absent.
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.attr(name)
            .ok_or_else(|| anyhow!("<{}> is missing required attribute '{}'", self.name, name))
    }

    fn xsi_type(&self) -> Result<&str> {
        self.required("type").map(strip_prefix)
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.attr(name) {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => bail!("<{}> attribute '{}' is not a boolean: '{}'", self.name, name, other),
        }
    }

    fn number(&self, name: &str, default: usize) -> Result<usize> {
        match self.attr(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .with_context(|| format!("<{}> attribute '{}' is not a number: '{}'", self.name, name, raw)),
        }
    }

    /// Target of a `*Reference` element: the `ref` attribute or the text.
    fn reference(&self) -> Result<String> {
        self.attr("ref")
            .or_else(|| Some(self.text.trim()).filter(|t| !t.is_empty()))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("<{}> does not name the rule it refers to", self.name))
    }
}

fn read_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Err(e) => {
                anyhow::bail!(
                    "XML parse error at position {}: {}",
                    reader.error_position(),
                    e
                )
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => stack.push(Element::from_start(&e)),
            Ok(Event::Empty(e)) => attach(&mut stack, &mut root, Element::from_start(&e))?,
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| anyhow!("unexpected closing tag at position {}", reader.buffer_position()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .with_context(|| format!("bad text at position {}", reader.buffer_position()))?;
                    top.text.push_str(&text);
                }
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        bail!("element <{}> is never closed", open.name);
    }
    root.ok_or_else(|| anyhow!("document has no root element"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => bail!("more than one root element"),
        None => *root = Some(element),
    }
    Ok(())
}

fn strip_prefix(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn local_name(e: &BytesStart<'_>) -> String {
    let full = String::from_utf8_lossy(e.name().as_ref()).to_string();
    strip_prefix(&full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<AttributeFilterPolicyGroup id="TestGroup"
            xmlns="urn:mace:shibboleth:2.0:afp"
            xmlns:basic="urn:mace:shibboleth:2.0:afp:mf:basic"
            xmlns:saml="urn:mace:shibboleth:2.0:afp:mf:saml"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#;

    fn group(body: &str) -> String {
        format!("{}{}</AttributeFilterPolicyGroup>", HEADER, body)
    }

    #[test]
    fn test_parse_release_to_anyone() {
        let xml = group(
            r#"
            <AttributeFilterPolicy id="releaseToAnyone">
                <PolicyRequirementRule xsi:type="basic:ANY"/>
                <AttributeRule attributeID="eduPersonPrincipalName">
                    <PermitValueRule xsi:type="basic:ANY"/>
                </AttributeRule>
                <AttributeRule attributeID="mail">
                    <PermitValueRule xsi:type="ANY"/>
                </AttributeRule>
            </AttributeFilterPolicy>"#,
        );
        let config = parse_str(&xml).unwrap();
        assert_eq!(config.id, "TestGroup");
        assert_eq!(config.policies.len(), 1);
        let policy = &config.policies[0];
        assert_eq!(policy.id, "releaseToAnyone");
        assert_eq!(policy.requirement, RuleRef::Inline(RequirementConfig::Any));
        assert_eq!(policy.attribute_rules.len(), 2);
        match &policy.attribute_rules[0] {
            RuleRef::Inline(rule) => {
                assert_eq!(rule.attribute_id, "eduPersonPrincipalName");
                assert_eq!(rule.permit, Some(RuleRef::Inline(MatcherConfig::Any)));
                assert!(!rule.is_deny());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_requester_and_scope_rules() {
        let xml = group(
            r#"
            <AttributeFilterPolicy id="sp">
                <PolicyRequirementRule xsi:type="basic:AttributeRequesterString"
                                       value="https://sp.example.org/shibboleth" ignoreCase="true"/>
                <AttributeRule attributeID="eduPersonScopedAffiliation">
                    <PermitValueRule xsi:type="basic:AttributeScopeString" value="example.org"/>
                </AttributeRule>
                <AttributeRule attributeID="uid">
                    <DenyValueRule xsi:type="basic:AttributeValueRegex" regex="^admin.*"/>
                </AttributeRule>
            </AttributeFilterPolicy>"#,
        );
        let config = parse_str(&xml).unwrap();
        let policy = &config.policies[0];
        assert_eq!(
            policy.requirement,
            RuleRef::Inline(RequirementConfig::Fact {
                fact: ContextFact::AttributeRequester,
                test: StringTest::Exact {
                    value: "https://sp.example.org/shibboleth".into(),
                    case_sensitive: false,
                },
            })
        );
        let RuleRef::Inline(scope) = &policy.attribute_rules[0] else {
            panic!("inline rule expected");
        };
        assert_eq!(
            scope.permit,
            Some(RuleRef::Inline(MatcherConfig::Value {
                target: ValueTarget::Scope,
                test: StringTest::Exact {
                    value: "example.org".into(),
                    case_sensitive: true,
                },
                attribute_id: None,
            }))
        );
        let RuleRef::Inline(uid) = &policy.attribute_rules[1] else {
            panic!("inline rule expected");
        };
        assert!(uid.is_deny());
    }

    #[test]
    fn test_parse_composites_and_references() {
        let xml = group(
            r#"
            <PolicyRequirementRule id="researchSp" xsi:type="saml:AttributeRequesterEntityAttributeExactMatch"
                attributeName="http://macedir.org/entity-category"
                attributeValue="http://refeds.org/category/research-and-scholarship"/>
            <PermitValueRule id="staffOnly" xsi:type="basic:AttributeValueString" value="staff"/>
            <AttributeRule id="sharedMail" attributeID="mail">
                <PermitValueRule xsi:type="basic:ANY"/>
            </AttributeRule>
            <AttributeFilterPolicy id="rands">
                <PolicyRequirementRule xsi:type="basic:AND">
                    <basic:Rule xsi:type="basic:NOT">
                        <basic:Rule xsi:type="basic:PrincipalNameString" value="guest"/>
                    </basic:Rule>
                    <basic:RuleReference ref="researchSp"/>
                </PolicyRequirementRule>
                <AttributeRuleReference ref="sharedMail"/>
                <AttributeRule attributeID="eduPersonAffiliation">
                    <PermitValueRuleReference>staffOnly</PermitValueRuleReference>
                </AttributeRule>
            </AttributeFilterPolicy>"#,
        );
        let config = parse_str(&xml).unwrap();
        assert!(config.shared_requirement_rules.contains_key("researchSp"));
        assert!(config.shared_matchers.contains_key("staffOnly"));
        assert!(config.shared_attribute_rules.contains_key("sharedMail"));

        let policy = &config.policies[0];
        let RuleRef::Inline(RequirementConfig::And(children)) = &policy.requirement else {
            panic!("AND expected, got {:?}", policy.requirement);
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(&children[0], RuleRef::Inline(RequirementConfig::Not(_))));
        assert_eq!(children[1], RuleRef::Reference("researchSp".into()));
        assert_eq!(policy.attribute_rules[0], RuleRef::Reference("sharedMail".into()));
        let RuleRef::Inline(affiliation) = &policy.attribute_rules[1] else {
            panic!("inline rule expected");
        };
        assert_eq!(affiliation.permit, Some(RuleRef::Reference("staffOnly".into())));
    }

    #[test]
    fn test_parse_metadata_types() {
        let xml = group(
            r#"
            <AttributeFilterPolicy id="metadata">
                <PolicyRequirementRule xsi:type="OR">
                    <Rule xsi:type="saml:AttributeRequesterInEntityGroup" groupID="urn:fed"/>
                    <Rule xsi:type="RegistrationAuthority" registrars="https://a.org https://b.org"
                          matchIfMetadataSilent="true"/>
                    <Rule xsi:type="NumberOfAttributeValues" attributeID="mail" minimum="1" maximum="3"/>
                    <Rule xsi:type="basic:AttributeValueString" attributeID="affiliation" value="staff"/>
                </PolicyRequirementRule>
                <AttributeRule attributeID="mail">
                    <PermitValueRule xsi:type="saml:AttributeInMetadata" onlyIfRequired="false"/>
                </AttributeRule>
                <AttributeRule attributeID="uid">
                    <PermitValueRule xsi:type="basic:AttributeRequesterString" value="https://sp.example.org"/>
                </AttributeRule>
            </AttributeFilterPolicy>"#,
        );
        let config = parse_str(&xml).unwrap();
        let policy = &config.policies[0];
        let RuleRef::Inline(RequirementConfig::Or(children)) = &policy.requirement else {
            panic!("OR expected");
        };
        assert_eq!(
            children[1],
            RuleRef::Inline(RequirementConfig::RegistrationAuthority {
                issuers: vec!["https://a.org".into(), "https://b.org".into()],
                match_if_metadata_silent: true,
            })
        );
        assert_eq!(
            children[2],
            RuleRef::Inline(RequirementConfig::NumOfAttributeValues {
                attribute_id: "mail".into(),
                minimum: 1,
                maximum: 3,
            })
        );
        assert!(matches!(
            &children[3],
            RuleRef::Inline(RequirementConfig::Matcher { attribute_id: Some(id), .. }) if id == "affiliation"
        ));

        let RuleRef::Inline(mail) = &policy.attribute_rules[0] else {
            panic!("inline rule expected");
        };
        assert_eq!(
            mail.permit,
            Some(RuleRef::Inline(MatcherConfig::InMetadata {
                only_if_required: false,
                match_if_metadata_silent: false,
                attribute_name: None,
                attribute_name_format: None,
            }))
        );
        let RuleRef::Inline(uid) = &policy.attribute_rules[1] else {
            panic!("inline rule expected");
        };
        assert!(matches!(uid.permit, Some(RuleRef::Inline(MatcherConfig::Requirement(_)))));
    }

    #[test]
    fn test_unknown_type_is_error() {
        let xml = group(
            r#"
            <AttributeFilterPolicy id="p">
                <PolicyRequirementRule xsi:type="basic:Script"/>
            </AttributeFilterPolicy>"#,
        );
        let err = format!("{:#}", parse_str(&xml).unwrap_err());
        assert!(err.contains("unsupported rule type 'Script'"), "{}", err);
        assert!(err.contains("AttributeFilterPolicy 'p'"), "{}", err);
    }

    #[test]
    fn test_missing_requirement_is_error() {
        let xml = group(
            r#"
            <AttributeFilterPolicy id="p">
                <AttributeRule attributeID="uid"><PermitValueRule xsi:type="ANY"/></AttributeRule>
            </AttributeFilterPolicy>"#,
        );
        let err = format!("{:#}", parse_str(&xml).unwrap_err());
        assert!(err.contains("no PolicyRequirementRule"), "{}", err);
    }

    #[test]
    fn test_attribute_rule_needs_one_value_rule() {
        let xml = group(
            r#"
            <AttributeFilterPolicy id="p">
                <PolicyRequirementRule xsi:type="ANY"/>
                <AttributeRule attributeID="uid">
                    <PermitValueRule xsi:type="ANY"/>
                    <DenyValueRule xsi:type="ANY"/>
                </AttributeRule>
            </AttributeFilterPolicy>"#,
        );
        assert!(parse_str(&xml).is_err());
    }

    #[test]
    fn test_malformed_xml_reports_position() {
        let err = parse_str("<AttributeFilterPolicyGroup><AttributeFilterPolicy></AttributeFilterPolicyGroup>")
            .unwrap_err()
            .to_string();
        assert!(err.contains("XML parse error at position"), "{}", err);
    }

    #[test]
    fn test_wrong_root_is_error() {
        assert!(parse_str("<AttributeResolver/>").is_err());
    }
}
