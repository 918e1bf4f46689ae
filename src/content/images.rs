use scraper::{Html, Selector};

use super::extract::find_region;
use crate::error::{Result, RolysError};

/// Raw `src` values of region images that point at absolute http(s) URLs.
///
/// Relative, empty and `data:` sources are skipped. A missing region, a
/// region without images, and a region without a qualifying URL all fail
/// with `NoImagesFound`.
pub fn collect_image_urls(page_html: &str, selector: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(page_html);
    let region = match find_region(&document, selector) {
        Ok(region) => region,
        Err(RolysError::RegionNotFound(selector)) => {
            tracing::error!("Content region not found: {}", selector);
            return Err(RolysError::NoImagesFound);
        }
        Err(e) => return Err(e),
    };

    let img = Selector::parse("img").map_err(|e| RolysError::Parse(e.to_string()))?;
    let images: Vec<_> = region.select(&img).collect();
    if images.is_empty() {
        tracing::error!("No img elements in the content region");
        return Err(RolysError::NoImagesFound);
    }

    let urls: Vec<String> = images
        .iter()
        .filter_map(|image| image.value().attr("src"))
        .filter(|src| src.starts_with("http"))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        tracing::error!("{} img elements but none with an absolute URL", images.len());
        return Err(RolysError::NoImagesFound);
    }

    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::REGION_SELECTOR;

    fn page(region: &str) -> String {
        format!(
            r#"<body><img src="https://outside.test/skip.png"><div class="col col-12 grid-col-9-lg z1">{}</div></body>"#,
            region
        )
    }

    #[test]
    fn collects_only_absolute_sources_inside_region() {
        let urls = collect_image_urls(
            &page(
                r#"<img src="https://cdn.test/a.png"><p><img src="http://cdn.test/b.jpg?w=200"></p>
                <img src="/relative.png"><img src=""><img><img src="data:image/png;base64,AAAA">"#,
            ),
            REGION_SELECTOR,
        )
        .unwrap();

        assert_eq!(urls, vec!["https://cdn.test/a.png", "http://cdn.test/b.jpg?w=200"]);
    }

    #[test]
    fn duplicates_are_kept_in_document_order() {
        let urls = collect_image_urls(
            &page(r#"<img src="https://cdn.test/a.png"><img src="https://cdn.test/a.png">"#),
            REGION_SELECTOR,
        )
        .unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn region_without_images_fails() {
        let result = collect_image_urls(&page("<p>text only</p>"), REGION_SELECTOR);
        assert!(matches!(result, Err(RolysError::NoImagesFound)));
    }

    #[test]
    fn region_with_only_relative_images_fails() {
        let result = collect_image_urls(&page(r#"<img src="a.png"><img src="/b.png">"#), REGION_SELECTOR);
        assert!(matches!(result, Err(RolysError::NoImagesFound)));
    }

    #[test]
    fn missing_region_fails_as_no_images() {
        let result = collect_image_urls(r#"<img src="https://cdn.test/a.png">"#, REGION_SELECTOR);
        assert!(matches!(result, Err(RolysError::NoImagesFound)));
    }
}
