//! 通知模板引擎
//!
//! 模板是命名的消息模式，`{{key}}` 占位符由变量包填充。
//! 注册表在进程启动时构建一次，之后只读。
//!
//! 解析失败封闭处理：未注册的模板名返回 `UnknownTemplate`，
//! 占位符缺少对应变量返回 `MissingVariable`，绝不渲染出空白占位符。
//! 变量包里多余的键被忽略。

use std::collections::HashMap;

use shared::Priority;

/// 模板错误
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("template {template} is missing variable {{{{{variable}}}}}")]
    MissingVariable { template: String, variable: String },
}

/// 通知模板（注册后不可变）
#[derive(Debug, Clone)]
pub struct NotificationTemplate {
    /// 模板名
    pub name: &'static str,
    /// 标题模式
    pub title: &'static str,
    /// 正文模式
    pub body: &'static str,
    /// 默认优先级
    pub priority: Priority,
}

/// 渲染结果
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub title: String,
    pub body: String,
    pub priority: Priority,
}

/// 模板注册表
///
/// 进程级状态：启动时初始化一次，运行期只读。
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: HashMap<&'static str, NotificationTemplate>,
}

/// 内置模板目录
///
/// 标题/正文为面向用户的西语文案，与原有页面一致。
const DEFAULT_TEMPLATES: &[NotificationTemplate] = &[
    NotificationTemplate {
        name: "STOCK_BAJO",
        title: "Stock bajo",
        body: "El producto {{producto}} tiene stock bajo: quedan {{cantidad}} unidades ({{fecha}} {{hora}})",
        priority: Priority::High,
    },
    NotificationTemplate {
        name: "STOCK_AGOTADO",
        title: "Stock agotado",
        body: "El producto {{producto}} se ha agotado ({{fecha}} {{hora}})",
        priority: Priority::High,
    },
    NotificationTemplate {
        name: "PEDIDO_CONFIRMADO",
        title: "Pedido confirmado",
        body: "Su pedido {{pedido}} ha sido confirmado ({{fecha}} {{hora}})",
        priority: Priority::Normal,
    },
    NotificationTemplate {
        name: "PEDIDO_EN_PRODUCCION",
        title: "Pedido en producción",
        body: "Su pedido {{pedido}} ha entrado en producción ({{fecha}} {{hora}})",
        priority: Priority::Normal,
    },
    NotificationTemplate {
        name: "PEDIDO_LISTO",
        title: "Pedido listo para entrega",
        body: "Su pedido {{pedido}} está listo para entrega ({{fecha}} {{hora}})",
        priority: Priority::Normal,
    },
    NotificationTemplate {
        name: "PEDIDO_ENTREGADO",
        title: "Pedido entregado",
        body: "Su pedido {{pedido}} ha sido entregado ({{fecha}} {{hora}})",
        priority: Priority::Normal,
    },
    NotificationTemplate {
        name: "PEDIDO_CANCELADO",
        title: "Pedido cancelado",
        body: "Su pedido {{pedido}} ha sido cancelado ({{fecha}} {{hora}})",
        priority: Priority::High,
    },
    NotificationTemplate {
        name: "BIENVENIDA",
        title: "Bienvenido",
        body: "Bienvenido {{usuario}}, notificaciones en tiempo real activadas",
        priority: Priority::Low,
    },
];

impl TemplateRegistry {
    /// 从模板列表构建注册表
    pub fn new(templates: impl IntoIterator<Item = NotificationTemplate>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.name, t)).collect(),
        }
    }

    /// 构建含内置目录的注册表
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TEMPLATES.iter().cloned())
    }

    /// 按名取模板
    pub fn get(&self, name: &str) -> Option<&NotificationTemplate> {
        self.templates.get(name)
    }

    /// 解析模板：名字 + 变量包 → 渲染结果
    pub fn resolve(
        &self,
        name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<Rendered, TemplateError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;

        Ok(Rendered {
            title: interpolate(template.name, template.title, variables)?,
            body: interpolate(template.name, template.body, variables)?,
            priority: template.priority,
        })
    }
}

/// 纯文本插值：把 `{{key}}` 替换为变量值
///
/// 模式里出现而变量包里没有的键是错误（封闭失败）。
fn interpolate(
    template_name: &str,
    pattern: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // 未闭合的 '{{' 按字面量保留
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let key = after[..end].trim();
        let value = variables
            .get(key)
            .ok_or_else(|| TemplateError::MissingVariable {
                template: template_name.to_string(),
                variable: key.to_string(),
            })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_substitutes_all_placeholders() {
        let registry = TemplateRegistry::with_defaults();
        let rendered = registry
            .resolve(
                "STOCK_BAJO",
                &vars(&[
                    ("producto", "Tornillo M4"),
                    ("cantidad", "2"),
                    ("fecha", "15/03/2024"),
                    ("hora", "14:30"),
                ]),
            )
            .expect("resolve should succeed");

        assert_eq!(rendered.title, "Stock bajo");
        assert_eq!(
            rendered.body,
            "El producto Tornillo M4 tiene stock bajo: quedan 2 unidades (15/03/2024 14:30)"
        );
        assert_eq!(rendered.priority, shared::Priority::High);
    }

    #[test]
    fn test_missing_variable_fails_closed() {
        let registry = TemplateRegistry::with_defaults();
        let err = registry
            .resolve("STOCK_BAJO", &vars(&[("producto", "Tornillo M4")]))
            .unwrap_err();

        match err {
            TemplateError::MissingVariable { template, variable } => {
                assert_eq!(template, "STOCK_BAJO");
                assert_eq!(variable, "cantidad");
            }
            other => panic!("expected MissingVariable, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_variables_are_ignored() {
        let registry = TemplateRegistry::with_defaults();
        let rendered = registry
            .resolve(
                "BIENVENIDA",
                &vars(&[("usuario", "maria"), ("sobra", "ignorado")]),
            )
            .expect("extra keys must not fail resolution");
        assert!(rendered.body.contains("maria"));
        assert!(!rendered.body.contains("ignorado"));
    }

    #[test]
    fn test_unknown_template() {
        let registry = TemplateRegistry::with_defaults();
        let err = registry.resolve("NO_EXISTE", &HashMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownTemplate(name) if name == "NO_EXISTE"));
    }

    #[test]
    fn test_unclosed_placeholder_kept_literal() {
        let out = interpolate("T", "hola {{nombre", &HashMap::new()).unwrap();
        assert_eq!(out, "hola {{nombre");
    }
}
