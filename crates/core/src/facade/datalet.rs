use super::UiService;
use crate::object::{DEFAULT_QUERY_LIMIT, DICT_TABLE};
use lynkui_api::{
    DataInsert, DataQuery, DataResult, DataResults, Pagelet, QueryFilter, Template,
    TemplateHtml, is_valid_namespace,
};
use tracing::{debug, info};

/// Asset-store prefix of the markup files html templates refer to.
const TEMPLATE_FILE_PREFIX: &str = "lynkui/tpl/";

impl UiService {
    /// Widget as served to clients: the schema of its datalet table is
    /// attached when one is known, and an html template that only names a
    /// file gets that file's markup.
    pub async fn fetch_pagelet(&self, name: &str) -> Option<Pagelet> {
        let mut pagelet = Pagelet::clone(&*self.assets.pagelet(name)?);
        if let Some(Template::Html(tpl)) = pagelet.template.as_mut() {
            if tpl.html.is_empty() && !tpl.file.is_empty() {
                let key = format!("{}{}", TEMPLATE_FILE_PREFIX, tpl.file);
                match self.assets.template(&key) {
                    Some(found) => tpl.html = found.html,
                    None => debug!("pagelet ({}) template {} not found", name, key),
                }
            }
        }
        if let Some(datalet) = pagelet.datalet.as_mut() {
            if !datalet.table_name.is_empty() {
                datalet.table_spec = self.layout.table_spec(&datalet.table_name).await;
            }
        }
        Some(pagelet)
    }

    pub fn template(&self, key: &str) -> Option<TemplateHtml> {
        self.assets.template(key)
    }

    /// Run the query declared by widget `name`. A filter set on the widget
    /// wins over `filter_override`.
    pub async fn run_datalet(
        &self,
        name: &str,
        filter_override: Option<QueryFilter>,
    ) -> DataResults {
        let mut results = DataResults::default();

        let Some(pagelet) = self.assets.pagelet(name) else {
            info!("pagelet ({}) not found", name);
            return results;
        };
        let Some(datalet) = pagelet.datalet.as_ref() else {
            info!("pagelet ({}) datalet not setup", name);
            return results;
        };

        let req = DataQuery {
            instance_name: String::new(),
            table_name: datalet.table_name.clone(),
            filter: datalet.filter.clone().or(filter_override),
            sort: datalet.effective_sort().cloned(),
            limit: datalet.limit,
        };
        match self.layout.query(req).await {
            Ok(rs) => results.results.push(shape(name, rs)),
            Err(e) => info!("pagelet ({}) query err {}", name, e),
        }
        results
    }

    /// One dictionary lookup per namespace; invalid names are skipped.
    pub async fn dict_query<S: AsRef<str>>(&self, namespaces: &[S]) -> DataResults {
        let mut results = DataResults::default();
        for ns in namespaces.iter().map(AsRef::as_ref) {
            if !is_valid_namespace(ns) {
                debug!("dict ns ({}) skipped", ns);
                continue;
            }
            let req = DataQuery::new(DICT_TABLE)
                .with_filter("ns", ns)
                .with_limit(DEFAULT_QUERY_LIMIT);
            match self.layout.query(req).await {
                Ok(rs) => results.results.push(shape(ns, rs)),
                Err(e) => info!("dict ns ({}) query err {}", ns, e),
            }
        }
        results
    }

    /// Route a write. Errors come back as the result status.
    pub async fn upsert(&self, req: DataInsert) -> DataResult {
        match self.layout.upsert(req).await {
            Ok(rs) => rs,
            Err(e) => DataResult::with_status(e.to_status()),
        }
    }
}

/// Keep the status; spec and rows only travel with a successful result.
fn shape(name: &str, rs: DataResult) -> DataResult {
    let mut out = DataResult {
        name: name.to_string(),
        status: rs.status.clone(),
        ..Default::default()
    };
    if rs.is_ok() && !rs.rows.is_empty() {
        out.spec = rs.spec;
        out.rows = rs.rows;
    }
    out
}
