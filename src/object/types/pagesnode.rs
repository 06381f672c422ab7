use std::collections::HashSet;
use super::page::Page;
use super::prelude::*;

/// Node in a page tree - type is either `Page` or `PageTree`
#[derive(Debug, Clone, pdf_derive::DataSize)]
pub enum PagesNode {
    Tree(PageTree),
    Leaf(Page),
}

impl Object for PagesNode {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<PagesNode> {
        let mut dict = p.resolve(resolve)?.into_dictionary()?;
        match dict.require("PagesNode", "Type")?.as_name()? {
            "Page" => Ok(PagesNode::Leaf(t!(Page::from_dict(dict, resolve)))),
            "Pages" => Ok(PagesNode::Tree(t!(PageTree::from_dict(dict, resolve)))),
            other => Err(PdfError::WrongDictionaryType {
                expected: "Page or Pages".into(),
                found: other.into(),
            }),
        }
    }
}
impl ObjectWrite for PagesNode {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        match *self {
            PagesNode::Tree(ref t) => t.to_primitive(update),
            PagesNode::Leaf(ref l) => l.to_primitive(update),
        }
    }
}

#[derive(Object, ObjectWrite, Debug, Default, Clone, pdf_derive::DataSize)]
#[pdf(Type = "Pages?")]
pub struct PageTree {
    #[pdf(key = "Parent")]
    pub parent: Option<PagesRc>,

    #[pdf(key = "Kids")]
    pub kids: Vec<Ref<PagesNode>>,

    #[pdf(key = "Count")]
    pub count: u32,

    #[pdf(key = "Resources")]
    pub resources: Option<MaybeRef<Resources>>,

    #[pdf(key = "MediaBox")]
    pub media_box: Option<Rectangle>,

    #[pdf(key = "CropBox")]
    pub crop_box: Option<Rectangle>,
}
impl PageTree {
    pub fn page(&self, resolve: &impl Resolve, page_nr: u32) -> Result<PageRc> {
        let mut visited = HashSet::new();
        self.page_inner(resolve, page_nr, &mut visited)
    }
    fn page_inner(
        &self,
        resolve: &impl Resolve,
        page_nr: u32,
        visited: &mut HashSet<PlainRef>,
    ) -> Result<PageRc> {
        let mut pos = 0;
        for &kid in &self.kids {
            let id = kid.get_inner();
            if !visited.insert(id) {
                warn!("page tree cycle at object {}, skipping", id.id);
                continue;
            }
            let node = resolve.get(kid)?;
            match *node {
                PagesNode::Tree(ref tree) => {
                    if (pos..pos + tree.count).contains(&page_nr) {
                        return tree.page_inner(resolve, page_nr - pos, visited);
                    }
                    pos += tree.count;
                }
                PagesNode::Leaf(ref _page) => {
                    if pos == page_nr {
                        return Ok(PageRc(node));
                    }
                    pos += 1;
                }
            }
        }
        Err(PdfError::PageOutOfBounds { page_nr, max: pos })
    }

    /// Flattens the page tree into an in-order list of pages (PDF
    /// reference §7.7.3). A node that has already been visited on this
    /// walk is logged and skipped rather than treated as an error -
    /// renderers are expected to tolerate a page tree with cycles.
    pub fn build_page_list(&self, resolve: &impl Resolve) -> Result<Vec<PageRc>> {
        let mut visited = HashSet::new();
        let mut pages = Vec::new();
        self.collect_pages(resolve, &mut visited, &mut pages)?;
        Ok(pages)
    }
    fn collect_pages(
        &self,
        resolve: &impl Resolve,
        visited: &mut HashSet<PlainRef>,
        pages: &mut Vec<PageRc>,
    ) -> Result<()> {
        for &kid in &self.kids {
            let id = kid.get_inner();
            if !visited.insert(id) {
                warn!("page tree cycle at object {}, skipping", id.id);
                continue;
            }
            let node = resolve.get(kid)?;
            match *node {
                PagesNode::Tree(ref tree) => tree.collect_pages(resolve, visited, pages)?,
                PagesNode::Leaf(ref _page) => pages.push(PageRc(node)),
            }
        }
        Ok(())
    }

    /*
    pub fn update_pages(&mut self, mut offset: u32, page_nr: u32, page: Page) -> Result<()> {
        for kid in &self.kids {
            // println!("{}/{} {:?}", offset, page_nr, kid);
            match *(self.get(*kid)?) {
                PagesNode::Tree(ref mut t) => {
                    if offset + t.count < page_nr {
                        offset += t.count;
                    } else {
                        return self.update_pages(t, offset, page_nr, page);
                    }
                },
                PagesNode::Leaf(ref mut p) => {
                    if offset < page_nr {
                        offset += 1;
                    } else {
                        assert_eq!(offset, page_nr);
                        let p = self.storage.create(page)?;
                        self.storage.update(kid.get_inner(), PagesNode::Leaf(p));
                        return Ok(());
                    }
                }
            }

        }
        Err(PdfError::PageNotFound {page_nr: page_nr})
    }
    pub fn pages<'a>(&'a self, resolve: &'a impl Resolve) -> impl Iterator<Item=Result<PageRc>> + 'a {
        self.kids.iter().flat_map(move |&r| {
            match resolve.get(r) {
                Ok(node) => Either::Left(node.pages(resolve)),
                Err(e) => Either::Right(once(Err(e)))
            }
        })
    }
    */
}
impl SubType<PagesNode> for PageTree {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// A resolver backed by a flat map of already-built dictionaries, just
    /// enough to drive `PagesNode::from_primitive` for these tests.
    struct MapResolve(HashMap<u64, Primitive>);
    impl Resolve for MapResolve {
        fn resolve(&self, r: PlainRef) -> Result<Primitive> {
            self.0.get(&r.id).cloned().ok_or(PdfError::NullRef { obj_nr: r.id })
        }
        fn get<T: Object>(&self, r: Ref<T>) -> Result<RcRef<T>> {
            let id = r.get_inner();
            let primitive = self.resolve(id)?;
            let obj = T::from_primitive(primitive, self)?;
            Ok(RcRef::new(id, std::rc::Rc::new(obj)))
        }
    }

    fn pages_dict(kids: &[u64], count: u32) -> Primitive {
        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::name("Pages"));
        dict.insert(
            "Kids",
            Primitive::Array(
                kids.iter().map(|&id| Primitive::Reference(PlainRef { id, gen: 0 })).collect(),
            ),
        );
        dict.insert("Count", Primitive::Integer(count as i32));
        Primitive::Dictionary(dict)
    }

    fn page_dict(parent: u64) -> Primitive {
        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::name("Page"));
        dict.insert("Parent", Primitive::Reference(PlainRef { id: parent, gen: 0 }));
        Primitive::Dictionary(dict)
    }

    #[test]
    fn build_page_list_flattens_in_order() {
        // obj 1: root Pages -> kids [2, 3]
        // obj 2: Page
        // obj 3: Page
        let mut map = HashMap::new();
        map.insert(1, pages_dict(&[2, 3], 2));
        map.insert(2, page_dict(1));
        map.insert(3, page_dict(1));
        let resolve = MapResolve(map);

        let root = resolve.resolve(PlainRef { id: 1, gen: 0 }).unwrap();
        let tree = PageTree::from_dict(root.into_dictionary(&resolve).unwrap(), &resolve).unwrap();

        let pages = tree.build_page_list(&resolve).unwrap();
        assert_eq!(pages.len(), 2);

        assert!(tree.page(&resolve, 0).is_ok());
        assert!(tree.page(&resolve, 1).is_ok());
        assert!(tree.page(&resolve, 2).is_err());
    }

    #[test]
    fn cyclic_kids_are_skipped_not_looped_forever() {
        // obj 1: root Pages, whose own Kids list cyclically includes itself
        // alongside one real page (obj 2).
        let mut map = HashMap::new();
        map.insert(1, pages_dict(&[1, 2], 1));
        map.insert(2, page_dict(1));
        let resolve = MapResolve(map);

        let root = resolve.resolve(PlainRef { id: 1, gen: 0 }).unwrap();
        let tree = PageTree::from_dict(root.into_dictionary(&resolve).unwrap(), &resolve).unwrap();

        let pages = tree.build_page_list(&resolve).unwrap();
        assert_eq!(pages.len(), 1);
    }
}
